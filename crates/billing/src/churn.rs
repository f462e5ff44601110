//! Churn rate and customer lifetime value.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use civic_core::tenancy::{Tenant, TenantStatus};

pub const DEFAULT_CHURN_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_LTV_CAP_MONTHS: f64 = 36.0;

/// Percentage of tenants cancelled within the trailing window:
/// `churned / (churned + active) * 100`.
///
/// "Churned" means status `CANCELADO` with its last status change inside
/// `[now - window_days, now]`. Tenants cancelled earlier are in neither the
/// numerator nor the active pool. With `tenant_filter` only that tenant is
/// considered. An empty denominator yields 0.
///
/// Negative windows count as zero. A window reaching past the earliest
/// representable instant starts there instead.
pub fn compute_churn_rate(
    tenants: &[Tenant],
    now: DateTime<Utc>,
    window_days: i64,
    tenant_filter: Option<Uuid>,
) -> f64 {
    let window_start = Duration::try_days(window_days.max(0))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut churned = 0u64;
    let mut active = 0u64;

    for tenant in tenants
        .iter()
        .filter(|t| tenant_filter.map_or(true, |id| t.id == id))
    {
        match tenant.status {
            TenantStatus::Cancelled
                if tenant.updated_at >= window_start && tenant.updated_at <= now =>
            {
                churned += 1
            }
            TenantStatus::Active => active += 1,
            _ => {}
        }
    }

    let denominator = churned + active;
    if denominator == 0 {
        return 0.0;
    }
    churned as f64 / denominator as f64 * 100.0
}

/// `arpu * min(1 / monthly_churn_fraction, cap_months)`. A churn rate of zero
/// (or anything non-positive) uses the cap directly.
pub fn compute_ltv(arpu: f64, churn_rate_pct: f64, cap_months: f64) -> f64 {
    if !arpu.is_finite() {
        return 0.0;
    }
    let fraction = churn_rate_pct / 100.0;
    let lifetime_months = if fraction > 0.0 && fraction.is_finite() {
        (1.0 / fraction).min(cap_months)
    } else {
        cap_months
    };
    arpu * lifetime_months
}
