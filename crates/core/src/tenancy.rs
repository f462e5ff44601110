//! Tenant, subscription and revenue-history records consumed by the metrics
//! engine. Wire names of plan and status match the stored records
//! (`STARTER`, `ATIVO`, ...).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// SaaS plan a tenant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    Starter,
    Professional,
    Enterprise,
}

impl Plan {
    pub fn all() -> Vec<Plan> {
        vec![Plan::Starter, Plan::Professional, Plan::Enterprise]
    }
}

/// Tenant lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TenantStatus {
    #[serde(rename = "TRIAL")]
    Trial,
    #[serde(rename = "ATIVO")]
    Active,
    #[serde(rename = "SUSPENSO")]
    Suspended,
    #[serde(rename = "CANCELADO")]
    Cancelled,
}

/// One customer organization (a municipality).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub plan: Plan,
    pub status: TenantStatus,
    #[serde(default)]
    pub active_users: u32,
    #[serde(default)]
    pub protocols_this_month: u32,
    #[serde(default)]
    pub storage_used_gb: f64,
    pub created_at: DateTime<Utc>,
    /// Last status change; for cancelled tenants this is the cancellation time.
    pub updated_at: DateTime<Utc>,
}

/// Subscription lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Cancelled,
    Trialing,
}

/// A tenant's subscription. At most one per tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub tenant_id: Uuid,
    #[serde(default)]
    pub monthly_value: f64,
    pub status: SubscriptionStatus,
    pub plan: Plan,
}

/// Historical revenue for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenuePoint {
    /// `YYYY-MM`. Left empty when the stored record lacks the key, which the
    /// engine reports as a data-integrity error.
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub mrr: f64,
    #[serde(default)]
    pub new_customers: u32,
    #[serde(default)]
    pub churned_customers: u32,
    #[serde(default)]
    pub upgrade_revenue: f64,
    #[serde(default)]
    pub addon_revenue: f64,
}

impl RevenuePoint {
    /// First day of the point's month.
    pub fn month_start(&self) -> CoreResult<NaiveDate> {
        if self.month.is_empty() {
            return Err(CoreError::DataIntegrity(
                "revenue point is missing its month".into(),
            ));
        }
        if self.month.len() != 7 {
            return Err(CoreError::DataIntegrity(format!(
                "revenue point month `{}` is not YYYY-MM",
                self.month
            )));
        }
        NaiveDate::parse_from_str(&format!("{}-01", self.month), "%Y-%m-%d").map_err(|_| {
            CoreError::DataIntegrity(format!(
                "revenue point month `{}` is not YYYY-MM",
                self.month
            ))
        })
    }
}

/// Optional filter for tenant queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantFilter {
    pub status: Option<TenantStatus>,
    pub plan: Option<Plan>,
}

impl TenantFilter {
    pub fn matches(&self, tenant: &Tenant) -> bool {
        self.status.map_or(true, |s| tenant.status == s)
            && self.plan.map_or(true, |p| tenant.plan == p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(month: &str) -> RevenuePoint {
        RevenuePoint {
            month: month.into(),
            mrr: 0.0,
            new_customers: 0,
            churned_customers: 0,
            upgrade_revenue: 0.0,
            addon_revenue: 0.0,
        }
    }

    #[test]
    fn test_month_start() {
        let d = point("2024-03").month_start().unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        assert!(matches!(point("").month_start(), Err(CoreError::DataIntegrity(_))));
        assert!(point("2024-13").month_start().is_err());
        assert!(point("2024-3").month_start().is_err());
        assert!(point("march").month_start().is_err());
    }

    #[test]
    fn test_missing_month_key_deserializes_empty() {
        let p: RevenuePoint = serde_json::from_str(r#"{"mrr": 1500.0}"#).unwrap();
        assert!(p.month.is_empty());
        assert!(p.month_start().is_err());
    }

    #[test]
    fn test_status_wire_names() {
        let s: TenantStatus = serde_json::from_str("\"ATIVO\"").unwrap();
        assert_eq!(s, TenantStatus::Active);
        let p: Plan = serde_json::from_str("\"PROFESSIONAL\"").unwrap();
        assert_eq!(p, Plan::Professional);
        assert_eq!(
            serde_json::to_string(&TenantStatus::Cancelled).unwrap(),
            "\"CANCELADO\""
        );
    }

    #[test]
    fn test_missing_optional_counts_default_to_zero() {
        let t: Tenant = serde_json::from_str(
            r#"{
                "id": "6f1d2c3e-0000-4000-8000-000000000001",
                "name": "Prefeitura de Exemplo",
                "plan": "STARTER",
                "status": "TRIAL",
                "created_at": "2024-01-10T00:00:00Z",
                "updated_at": "2024-01-10T00:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(t.active_users, 0);
        assert_eq!(t.storage_used_gb, 0.0);
    }
}
