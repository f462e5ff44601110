//! SaaS metrics for the provider side of the platform.
//!
//! Pure functions over tenant, subscription and revenue snapshots: MRR/ARR,
//! revenue trend and growth, churn and lifetime value, and the account-health
//! score. Nothing here touches a store; callers fetch the snapshot first.

pub mod churn;
pub mod health;
pub mod metrics;
pub mod revenue;

pub use churn::{compute_churn_rate, compute_ltv};
pub use health::{compute_health_score, HealthInputs, HealthLabel, HealthScore};
pub use metrics::{compute_saas_metrics, DataAnomaly, PlanDistribution, SaaSMetrics};
pub use revenue::{compute_growth, compute_revenue_trend, GrowthMetrics, RevenueTrend};
