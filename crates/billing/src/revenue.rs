//! Revenue history: month-over-month trend and growth percentages.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use civic_core::error::{CoreError, CoreResult};
use civic_core::tenancy::RevenuePoint;

/// Growth of the latest month over the one before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetrics {
    pub mrr_growth_pct: f64,
    pub customer_growth_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub month: String,
    pub mrr: f64,
    pub new_customers: u32,
    pub churned_customers: u32,
    pub net_new_customers: i64,
    /// Upgrade plus add-on revenue.
    pub expansion_revenue: f64,
    /// Against the previous month; 0 for the first month.
    pub mrr_growth_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueTrend {
    pub points: Vec<TrendPoint>,
    pub growth: GrowthMetrics,
}

/// `(current - previous) / previous * 100`, or 0 when `previous` is zero or
/// either side is not finite.
pub fn growth_pct(current: f64, previous: f64) -> f64 {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Validate months and return the history in chronological order.
fn chronological(history: &[RevenuePoint]) -> CoreResult<Vec<(NaiveDate, &RevenuePoint)>> {
    let mut seen = HashSet::with_capacity(history.len());
    let mut dated = Vec::with_capacity(history.len());
    for point in history {
        let start = point.month_start()?;
        if !seen.insert(start) {
            return Err(CoreError::DataIntegrity(format!(
                "revenue history has month `{}` twice",
                point.month
            )));
        }
        dated.push((start, point));
    }
    dated.sort_by_key(|(start, _)| *start);
    Ok(dated)
}

/// Growth from the last two points. Fewer than two points yields zeros.
pub fn compute_growth(history: &[RevenuePoint]) -> CoreResult<GrowthMetrics> {
    let dated = chronological(history)?;
    Ok(match dated.as_slice() {
        [.., (_, previous), (_, current)] => GrowthMetrics {
            mrr_growth_pct: growth_pct(current.mrr, previous.mrr),
            customer_growth_pct: growth_pct(
                f64::from(current.new_customers),
                f64::from(previous.new_customers),
            ),
        },
        _ => GrowthMetrics::default(),
    })
}

/// Month-by-month trend plus the latest growth figures.
pub fn compute_revenue_trend(history: &[RevenuePoint]) -> CoreResult<RevenueTrend> {
    let dated = chronological(history)?;
    let mut points = Vec::with_capacity(dated.len());
    let mut previous_mrr: Option<f64> = None;

    for (_, point) in &dated {
        points.push(TrendPoint {
            month: point.month.clone(),
            mrr: point.mrr,
            new_customers: point.new_customers,
            churned_customers: point.churned_customers,
            net_new_customers: i64::from(point.new_customers) - i64::from(point.churned_customers),
            expansion_revenue: point.upgrade_revenue + point.addon_revenue,
            mrr_growth_pct: previous_mrr.map_or(0.0, |prev| growth_pct(point.mrr, prev)),
        });
        previous_mrr = Some(point.mrr);
    }

    Ok(RevenueTrend {
        points,
        growth: compute_growth(history)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(month: &str, mrr: f64, new_customers: u32) -> RevenuePoint {
        RevenuePoint {
            month: month.into(),
            mrr,
            new_customers,
            churned_customers: 1,
            upgrade_revenue: 100.0,
            addon_revenue: 50.0,
        }
    }

    #[test]
    fn test_growth_uses_last_two_months_in_order() {
        // Deliberately unsorted.
        let history = vec![
            point("2024-05", 120_000.0, 5),
            point("2024-03", 90_000.0, 2),
            point("2024-04", 100_000.0, 4),
        ];
        let growth = compute_growth(&history).unwrap();
        assert_eq!(growth.mrr_growth_pct, 20.0);
        assert_eq!(growth.customer_growth_pct, 25.0);
    }

    #[test]
    fn test_growth_guards() {
        assert_eq!(compute_growth(&[]).unwrap(), GrowthMetrics::default());
        assert_eq!(
            compute_growth(&[point("2024-01", 10.0, 1)]).unwrap(),
            GrowthMetrics::default()
        );
        let from_zero = compute_growth(&[point("2024-01", 0.0, 0), point("2024-02", 500.0, 3)])
            .unwrap();
        assert_eq!(from_zero.mrr_growth_pct, 0.0);
        assert_eq!(from_zero.customer_growth_pct, 0.0);
    }

    #[test]
    fn test_trend_points() {
        let trend = compute_revenue_trend(&[
            point("2024-02", 110.0, 3),
            point("2024-01", 100.0, 2),
        ])
        .unwrap();
        assert_eq!(trend.points.len(), 2);
        assert_eq!(trend.points[0].month, "2024-01");
        assert_eq!(trend.points[0].mrr_growth_pct, 0.0);
        assert_eq!(trend.points[1].net_new_customers, 2);
        assert_eq!(trend.points[1].expansion_revenue, 150.0);
        assert!((trend.points[1].mrr_growth_pct - 10.0).abs() < 1e-9);
        assert_eq!(trend.growth.customer_growth_pct, 50.0);
    }

    #[test]
    fn test_malformed_history_is_data_integrity_error() {
        let missing = vec![point("2024-01", 1.0, 1), point("", 2.0, 1)];
        assert!(matches!(
            compute_revenue_trend(&missing),
            Err(CoreError::DataIntegrity(_))
        ));

        let duplicate = vec![point("2024-01", 1.0, 1), point("2024-01", 2.0, 1)];
        assert!(matches!(
            compute_growth(&duplicate),
            Err(CoreError::DataIntegrity(_))
        ));
    }
}
