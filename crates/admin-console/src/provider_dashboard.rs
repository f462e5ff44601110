//! Provider dashboard: cross-tenant SaaS overview for the platform operator.
//! Pulls one snapshot from the entity store and runs the metrics engine over it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use civic_billing::churn::{compute_churn_rate, compute_ltv};
use civic_billing::health::{compute_health_score, HealthInputs, HealthScore};
use civic_billing::metrics::{compute_saas_metrics, DataAnomaly, SaaSMetrics};
use civic_billing::revenue::{compute_revenue_trend, GrowthMetrics, RevenueTrend};
use civic_core::config::MetricsConfig;
use civic_core::error::{CoreError, CoreResult};
use civic_core::tenancy::{Plan, Subscription, TenantFilter, TenantStatus};
use civic_platform::store::EntityStore;

/// Full dashboard snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub metrics: SaaSMetrics,
    pub trend: RevenueTrend,
    pub growth: GrowthMetrics,
    pub churn_rate_pct: f64,
    pub ltv: f64,
    pub health: HealthScore,
    /// Metrics anomalies plus any revenue-history problems.
    pub anomalies: Vec<DataAnomaly>,
    pub generated_at: DateTime<Utc>,
}

/// Per-tenant row for the admin table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRow {
    pub tenant_id: Uuid,
    pub name: String,
    pub plan: Plan,
    pub status: TenantStatus,
    pub active_users: u32,
    pub protocols_this_month: u32,
    pub storage_used_gb: f64,
    pub mrr: f64,
    pub created_at: DateTime<Utc>,
}

pub struct ProviderDashboard<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    config: MetricsConfig,
}

impl<'a, S: EntityStore + ?Sized> ProviderDashboard<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_config(store, MetricsConfig::default())
    }

    pub fn with_config(store: &'a S, config: MetricsConfig) -> Self {
        Self { store, config }
    }

    /// Build the full report as of `now`.
    ///
    /// Store failures propagate. A malformed revenue history does not: it is
    /// logged, recorded as an anomaly, and growth falls back to zero.
    pub fn report(&self, now: DateTime<Utc>) -> CoreResult<DashboardReport> {
        let tenants = self.store.get_tenants(None)?;
        let subscriptions = self.store.get_subscriptions(None)?;
        let history = self
            .store
            .get_revenue_history(self.config.revenue_history_months)?;

        let metrics = compute_saas_metrics(&tenants, &subscriptions, now);
        let mut anomalies = metrics.anomalies.clone();

        let trend = match compute_revenue_trend(&history) {
            Ok(trend) => trend,
            Err(CoreError::DataIntegrity(reason)) => {
                warn!(%reason, "Revenue history rejected; growth reported as zero");
                anomalies.push(DataAnomaly::general(format!("revenue history: {reason}")));
                RevenueTrend::default()
            }
            Err(e) => return Err(e),
        };
        let growth = trend.growth;

        let churn_rate_pct =
            compute_churn_rate(&tenants, now, self.config.churn_window_days, None);
        let ltv = compute_ltv(metrics.arpu, churn_rate_pct, self.config.ltv_cap_months);
        let health = compute_health_score(&HealthInputs {
            mrr_growth_pct: growth.mrr_growth_pct,
            churn_rate_pct,
            new_tenants_this_month: metrics.new_tenants_this_month,
            mrr: metrics.mrr,
        });

        info!(
            mrr = metrics.mrr,
            tenants = metrics.total_tenants,
            health = health.score,
            anomalies = anomalies.len(),
            "Provider dashboard generated"
        );

        Ok(DashboardReport {
            metrics,
            trend,
            growth,
            churn_rate_pct,
            ltv,
            health,
            anomalies,
            generated_at: now,
        })
    }

    /// Per-tenant table, sorted by name. `mrr` is the subscription value for
    /// tenants that have one, regardless of status.
    pub fn tenant_table(&self, filter: Option<&TenantFilter>) -> CoreResult<Vec<TenantRow>> {
        let tenants = self.store.get_tenants(filter)?;
        let ids: Vec<Uuid> = tenants.iter().map(|t| t.id).collect();
        let subscriptions = self.store.get_subscriptions(Some(ids.as_slice()))?;
        let by_tenant: HashMap<Uuid, &Subscription> =
            subscriptions.iter().map(|s| (s.tenant_id, s)).collect();

        let mut rows: Vec<TenantRow> = tenants
            .into_iter()
            .map(|t| {
                let mrr = by_tenant
                    .get(&t.id)
                    .map(|s| s.monthly_value)
                    .filter(|v| v.is_finite())
                    .unwrap_or(0.0);
                TenantRow {
                    tenant_id: t.id,
                    name: t.name,
                    plan: t.plan,
                    status: t.status,
                    active_users: t.active_users,
                    protocols_this_month: t.protocols_this_month,
                    storage_used_gb: t.storage_used_gb,
                    mrr,
                    created_at: t.created_at,
                }
            })
            .collect();

        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use civic_billing::health::HealthLabel;
    use civic_core::tenancy::{RevenuePoint, SubscriptionStatus, Tenant};
    use civic_platform::store::InMemoryStore;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn tenant(name: &str, status: TenantStatus, plan: Plan, users: u32) -> Tenant {
        let created = now() - Duration::days(200);
        Tenant {
            id: Uuid::new_v4(),
            name: name.into(),
            plan,
            status,
            active_users: users,
            protocols_this_month: 40,
            storage_used_gb: 2.0,
            created_at: created,
            updated_at: created,
        }
    }

    fn subscribe(store: &InMemoryStore, tenant: &Tenant, value: f64) {
        store.upsert_subscription(Subscription {
            tenant_id: tenant.id,
            monthly_value: value,
            status: SubscriptionStatus::Active,
            plan: tenant.plan,
        });
    }

    fn revenue(month: &str, mrr: f64) -> RevenuePoint {
        RevenuePoint {
            month: month.into(),
            mrr,
            new_customers: 1,
            churned_customers: 0,
            upgrade_revenue: 0.0,
            addon_revenue: 0.0,
        }
    }

    fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        let a = tenant("Campinas", TenantStatus::Active, Plan::Professional, 6);
        let b = tenant("Bauru", TenantStatus::Active, Plan::Starter, 4);
        let c = tenant("Sorocaba", TenantStatus::Trial, Plan::Starter, 2);
        subscribe(&store, &a, 1500.0);
        subscribe(&store, &b, 497.0);
        for t in [a, b, c] {
            store.upsert_tenant(t);
        }
        store.record_revenue(revenue("2024-04", 1000.0));
        store.record_revenue(revenue("2024-05", 1997.0));
        store
    }

    #[test]
    fn test_report() {
        let store = seeded();
        let report = ProviderDashboard::new(&store).report(now()).unwrap();

        assert_eq!(report.metrics.mrr, 1997.0);
        assert_eq!(report.metrics.arr, 23964.0);
        assert!((report.metrics.arpu - 199.7).abs() < 1e-9);
        assert!((report.growth.mrr_growth_pct - 99.7).abs() < 1e-9);
        assert_eq!(report.trend.points.len(), 2);
        assert_eq!(report.churn_rate_pct, 0.0);
        assert_eq!(report.ltv, report.metrics.arpu * 36.0);
        // growth 30 + churn 25 + no new tenants 0 + small MRR 0
        assert_eq!(report.health.score, 55);
        assert_eq!(report.health.label, HealthLabel::Fair);
        assert!(report.anomalies.is_empty());
    }

    #[test]
    fn test_report_degrades_on_bad_history() {
        let store = seeded();
        store.record_revenue(revenue("2024-13", 5.0));

        let report = ProviderDashboard::new(&store).report(now()).unwrap();
        assert_eq!(report.growth, GrowthMetrics::default());
        assert!(report.trend.points.is_empty());
        assert_eq!(report.metrics.mrr, 1997.0);
        assert!(report
            .anomalies
            .iter()
            .any(|a| a.tenant_id.is_none() && a.reason.starts_with("revenue history")));
    }

    #[test]
    fn test_tenant_table() {
        let store = seeded();
        let dashboard = ProviderDashboard::new(&store);
        let rows = dashboard.tenant_table(None).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "Bauru");
        assert_eq!(rows[0].mrr, 497.0);
        assert_eq!(rows[2].name, "Sorocaba");
        assert_eq!(rows[2].mrr, 0.0);

        let trials = dashboard
            .tenant_table(Some(&TenantFilter {
                status: Some(TenantStatus::Trial),
                plan: None,
            }))
            .unwrap();
        assert_eq!(trials.len(), 1);
    }

    #[test]
    fn test_tenant_table_matches_each_tenant_to_its_own_subscription() {
        let store = InMemoryStore::new();
        let mut expected = Vec::new();
        for i in 0..200u32 {
            let t = tenant(&format!("Municipio {i:03}"), TenantStatus::Active, Plan::Starter, 1);
            let value = if i % 7 == 0 { f64::NAN } else { f64::from(i) * 10.0 };
            if i % 5 != 0 {
                subscribe(&store, &t, value);
            }
            let shown = if i % 5 == 0 || value.is_nan() { 0.0 } else { value };
            expected.push((t.name.clone(), shown));
            store.upsert_tenant(t);
        }

        let rows = ProviderDashboard::new(&store).tenant_table(None).unwrap();
        let got: Vec<(String, f64)> = rows.into_iter().map(|r| (r.name, r.mrr)).collect();
        assert_eq!(got, expected);
    }
}
