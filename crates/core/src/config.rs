use serde::Deserialize;
use tracing::debug;

use crate::error::CoreResult;
use crate::types::{AccessRule, Resource};

/// Root application configuration. Loaded from environment variables
/// with the prefix `CIVIC_ADMIN__` and an optional TOML config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub users: UserPolicyConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessConfig {
    /// TOML file holding the resource registry and the access rules.
    /// When absent the built-in municipal matrix is used.
    #[serde(default)]
    pub rules_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserPolicyConfig {
    #[serde(default = "default_min_credential_len")]
    pub min_credential_len: usize,
    /// bcrypt work factor (4..=31).
    #[serde(default = "default_credential_cost")]
    pub credential_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_revenue_history_months")]
    pub revenue_history_months: usize,
    #[serde(default = "default_churn_window_days")]
    pub churn_window_days: i64,
    #[serde(default = "default_ltv_cap_months")]
    pub ltv_cap_months: f64,
}

fn default_min_credential_len() -> usize {
    6
}
fn default_credential_cost() -> u32 {
    12
}
fn default_revenue_history_months() -> usize {
    12
}
fn default_churn_window_days() -> i64 {
    30
}
fn default_ltv_cap_months() -> f64 {
    36.0
}

impl Default for UserPolicyConfig {
    fn default() -> Self {
        Self {
            min_credential_len: default_min_credential_len(),
            credential_cost: default_credential_cost(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            revenue_history_months: default_revenue_history_months(),
            churn_window_days: default_churn_window_days(),
            ltv_cap_months: default_ltv_cap_months(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(path: Option<&str>) -> CoreResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder
                .add_source(config::File::new(path, config::FileFormat::Toml).required(false));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("CIVIC_ADMIN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

/// Contents of the access-rule file: the static resource registry and the
/// (role, resource, access) triples that form the base matrix.
///
/// ```toml
/// [[resources]]
/// id = "health.medications"
/// name = "Medications"
/// module = "health"
///
/// [[rules]]
/// role = "secretary"
/// resource = "health.medications"
/// access = "total"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessRulesFile {
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub rules: Vec<AccessRule>,
}

impl AccessRulesFile {
    pub fn load(path: &str) -> CoreResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Toml))
            .build()?;
        let file: Self = config.try_deserialize()?;
        debug!(
            path,
            resources = file.resources.len(),
            rules = file.rules.len(),
            "Access rule file parsed"
        );
        Ok(file)
    }

    /// Parse rules from an in-memory TOML document.
    pub fn from_toml_str(raw: &str) -> CoreResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessLevel, Role};

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.users.min_credential_len, 6);
        assert_eq!(cfg.users.credential_cost, 12);
        assert_eq!(cfg.metrics.churn_window_days, 30);
        assert_eq!(cfg.metrics.ltv_cap_months, 36.0);
        assert!(cfg.access.rules_path.is_none());
    }

    #[test]
    fn test_rules_from_toml() {
        let file = AccessRulesFile::from_toml_str(
            r#"
            [[resources]]
            id = "health.medications"
            name = "Medications"
            module = "health"

            [[rules]]
            role = "operator"
            resource = "health.medications"
            access = "read_only"
            "#,
        )
        .unwrap();
        assert_eq!(file.resources.len(), 1);
        assert_eq!(file.rules[0].role, Role::Operator);
        assert_eq!(file.rules[0].access, AccessLevel::ReadOnly);
        assert_eq!(file.rules[0].resource.as_str(), "health.medications");
    }

    #[test]
    fn test_rules_reject_malformed_resource() {
        let result = AccessRulesFile::from_toml_str(
            r#"
            [[rules]]
            role = "operator"
            resource = "Health Meds"
            access = "total"
            "#,
        );
        assert!(result.is_err());
    }
}
