//! civic-admin: operator CLI over the municipal administration libraries.
//!
//! Resolves access decisions against the configured matrix, prints a role's
//! permission row, and runs the provider dashboard over a JSON snapshot.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};

use civic_admin_console::ProviderDashboard;
use civic_core::config::{AccessRulesFile, AppConfig};
use civic_core::tenancy::{RevenuePoint, Subscription, Tenant};
use civic_core::types::{Action, Role};
use civic_platform::rbac::{AccessMatrix, AccessResolver};
use civic_platform::store::InMemoryStore;

#[derive(Parser, Debug)]
#[command(name = "civic-admin")]
#[command(about = "Municipal platform administration tool")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment overrides use CIVIC_ADMIN__*)
    #[arg(short, long, env = "CIVIC_ADMIN_CONFIG")]
    config: Option<String>,

    /// Access-rule file (overrides config)
    #[arg(long)]
    rules: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a role's access level on a resource
    Resolve {
        /// Role name, e.g. secretary
        #[arg(short, long)]
        role: String,

        /// Dotted resource id, e.g. health.medications
        #[arg(long)]
        resource: String,

        /// Also check whether this action is allowed
        #[arg(short, long)]
        action: Option<String>,
    },

    /// Print the permission row for one role, or for every role
    Matrix {
        #[arg(short, long)]
        role: Option<String>,
    },

    /// Compute the provider dashboard over a JSON snapshot
    Metrics {
        /// File with `tenants`, `subscriptions` and `revenue` arrays
        #[arg(short, long)]
        snapshot: String,

        /// Evaluation instant (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    tenants: Vec<Tenant>,
    #[serde(default)]
    subscriptions: Vec<Subscription>,
    #[serde(default)]
    revenue: Vec<RevenuePoint>,
}

fn load_matrix(rules_path: Option<&str>) -> anyhow::Result<AccessMatrix> {
    match rules_path {
        Some(path) => {
            let file = AccessRulesFile::load(path)
                .with_context(|| format!("reading access rules from {path}"))?;
            let matrix = AccessMatrix::from_rules_file(file)
                .with_context(|| format!("building access matrix from {path}"))?;
            info!(path, "Access rules loaded from file");
            Ok(matrix)
        }
        None => Ok(AccessMatrix::municipal_default()?),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "civic_admin=info,civic_platform=info,civic_billing=info".into()
            }),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(rules) = cli.rules {
        config.access.rules_path = Some(rules);
    }

    info!(
        rules_path = ?config.access.rules_path,
        revenue_history_months = config.metrics.revenue_history_months,
        churn_window_days = config.metrics.churn_window_days,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Resolve {
            role,
            resource,
            action,
        } => {
            let resolver = AccessResolver::new(load_matrix(config.access.rules_path.as_deref())?);
            let role: Role = role.parse()?;
            let level = resolver.resolve(role, &resource)?;
            match action {
                Some(action) => {
                    let action: Action = action.parse()?;
                    println!("{role} {resource} {level} {action}={}", level.permits(action));
                }
                None => println!("{role} {resource} {level}"),
            }
        }
        Commands::Matrix { role } => {
            let matrix = load_matrix(config.access.rules_path.as_deref())?;
            let roles = match role {
                Some(role) => vec![role.parse::<Role>()?],
                None => Role::all(),
            };
            for role in roles {
                println!("[{}]", role.label());
                for (resource, level) in matrix.permissions_for_role(role) {
                    println!("  {:<28} {level}", resource.id.as_str());
                }
            }
        }
        Commands::Metrics { snapshot, now } => {
            let raw = std::fs::read_to_string(&snapshot)
                .with_context(|| format!("reading snapshot {snapshot}"))?;
            let data: Snapshot = serde_json::from_str(&raw)
                .with_context(|| format!("parsing snapshot {snapshot}"))?;
            let now = match now {
                Some(ts) => DateTime::parse_from_rfc3339(&ts)
                    .with_context(|| format!("invalid --now `{ts}`"))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };

            let store = InMemoryStore::new();
            store.load_snapshot(data.tenants, data.subscriptions, data.revenue);
            let report =
                ProviderDashboard::with_config(&store, config.metrics.clone()).report(now)?;
            if !report.anomalies.is_empty() {
                warn!(count = report.anomalies.len(), "Snapshot has data anomalies");
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
