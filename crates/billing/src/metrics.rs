//! SaaS metrics over a point-in-time tenant/subscription snapshot.
//!
//! Pure computation: no I/O, no caching. Records that break the snapshot's
//! invariants (an `ATIVO` tenant without a subscription, a non-finite
//! amount) contribute zero and are reported in [`SaaSMetrics::anomalies`].

use std::collections::HashMap;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use civic_core::tenancy::{Plan, Subscription, SubscriptionStatus, Tenant, TenantStatus};

/// Tenant count per plan, across every status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDistribution {
    pub starter: u64,
    pub professional: u64,
    pub enterprise: u64,
}

impl PlanDistribution {
    fn record(&mut self, plan: Plan) {
        match plan {
            Plan::Starter => self.starter += 1,
            Plan::Professional => self.professional += 1,
            Plan::Enterprise => self.enterprise += 1,
        }
    }

    pub fn get(&self, plan: Plan) -> u64 {
        match plan {
            Plan::Starter => self.starter,
            Plan::Professional => self.professional,
            Plan::Enterprise => self.enterprise,
        }
    }
}

/// A record that was excluded or zeroed while computing metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAnomaly {
    pub tenant_id: Option<Uuid>,
    pub reason: String,
}

impl DataAnomaly {
    pub fn tenant(tenant_id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            reason: reason.into(),
        }
    }

    pub fn general(reason: impl Into<String>) -> Self {
        Self {
            tenant_id: None,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaaSMetrics {
    pub mrr: f64,
    pub arr: f64,
    pub arpu: f64,
    pub total_tenants: u64,
    pub active_tenants: u64,
    pub trial_tenants: u64,
    pub suspended_tenants: u64,
    pub cancelled_tenants: u64,
    /// Users across active tenants; the ARPU denominator.
    pub total_users: u64,
    pub total_protocols_this_month: u64,
    pub new_tenants_this_month: u64,
    pub plan_distribution: PlanDistribution,
    pub average_storage_used: f64,
    pub anomalies: Vec<DataAnomaly>,
}

/// First instant of `now`'s calendar month (UTC).
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Derive the SaaS metrics object. `now` bounds the "this month" window.
pub fn compute_saas_metrics(
    tenants: &[Tenant],
    subscriptions: &[Subscription],
    now: DateTime<Utc>,
) -> SaaSMetrics {
    let mut metrics = SaaSMetrics::default();

    let mut by_tenant: HashMap<Uuid, &Subscription> = HashMap::with_capacity(subscriptions.len());
    for sub in subscriptions {
        if by_tenant.insert(sub.tenant_id, sub).is_some() {
            warn!(tenant_id = %sub.tenant_id, "Tenant has more than one subscription");
            metrics.anomalies.push(DataAnomaly::tenant(
                sub.tenant_id,
                "more than one subscription; the last one was used",
            ));
        }
    }

    let period_start = month_start(now);
    let mut storage_total = 0.0;

    for tenant in tenants {
        metrics.total_tenants += 1;
        metrics.plan_distribution.record(tenant.plan);
        metrics.total_protocols_this_month += u64::from(tenant.protocols_this_month);
        storage_total += finite_or_zero(tenant.storage_used_gb);
        if tenant.created_at >= period_start && tenant.created_at <= now {
            metrics.new_tenants_this_month += 1;
        }

        match tenant.status {
            TenantStatus::Trial => metrics.trial_tenants += 1,
            TenantStatus::Suspended => metrics.suspended_tenants += 1,
            TenantStatus::Cancelled => metrics.cancelled_tenants += 1,
            TenantStatus::Active => {
                metrics.active_tenants += 1;
                metrics.total_users += u64::from(tenant.active_users);
                metrics.mrr += active_tenant_revenue(
                    tenant,
                    by_tenant.get(&tenant.id),
                    &mut metrics.anomalies,
                );
            }
        }
    }

    metrics.arr = metrics.mrr * 12.0;
    metrics.arpu = if metrics.total_users > 0 {
        metrics.mrr / metrics.total_users as f64
    } else {
        0.0
    };
    metrics.average_storage_used = if metrics.total_tenants > 0 {
        storage_total / metrics.total_tenants as f64
    } else {
        0.0
    };
    metrics
}

fn active_tenant_revenue(
    tenant: &Tenant,
    subscription: Option<&&Subscription>,
    anomalies: &mut Vec<DataAnomaly>,
) -> f64 {
    let Some(sub) = subscription else {
        warn!(tenant_id = %tenant.id, tenant = %tenant.name, "Active tenant has no subscription");
        anomalies.push(DataAnomaly::tenant(
            tenant.id,
            "active tenant without subscription; excluded from MRR",
        ));
        return 0.0;
    };
    if sub.status != SubscriptionStatus::Active {
        warn!(
            tenant_id = %tenant.id,
            status = ?sub.status,
            "Active tenant with inactive subscription"
        );
        anomalies.push(DataAnomaly::tenant(
            tenant.id,
            format!("active tenant with {:?} subscription", sub.status),
        ));
    }
    if !sub.monthly_value.is_finite() {
        warn!(tenant_id = %tenant.id, "Subscription monthly value is not a number");
        anomalies.push(DataAnomaly::tenant(
            tenant.id,
            "subscription monthly value is not finite; counted as zero",
        ));
        return 0.0;
    }
    sub.monthly_value
}
