//! Account-health score: four weighted bands summed to 0..=100 and bucketed
//! into a label. Deterministic and monotonic in each input's favourable
//! direction.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthInputs {
    pub mrr_growth_pct: f64,
    pub churn_rate_pct: f64,
    pub new_tenants_this_month: u64,
    pub mrr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthLabel {
    Excellent,
    Good,
    Fair,
    NeedsAttention,
}

impl HealthLabel {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => HealthLabel::Excellent,
            60..=79 => HealthLabel::Good,
            40..=59 => HealthLabel::Fair,
            _ => HealthLabel::NeedsAttention,
        }
    }
}

impl fmt::Display for HealthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthLabel::Excellent => "Excellent",
            HealthLabel::Good => "Good",
            HealthLabel::Fair => "Fair",
            HealthLabel::NeedsAttention => "Needs Attention",
        })
    }
}

/// Points awarded per band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthBreakdown {
    /// 0-30
    pub growth: u32,
    /// 0-25
    pub churn: u32,
    /// 0-25
    pub acquisition: u32,
    /// 0-20
    pub scale: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthScore {
    pub score: u32,
    pub label: HealthLabel,
    pub breakdown: HealthBreakdown,
}

fn growth_points(pct: f64) -> u32 {
    if pct > 20.0 {
        30
    } else if pct > 10.0 {
        20
    } else if pct > 0.0 {
        10
    } else {
        0
    }
}

// NaN fails every comparison and falls through to 0.
fn churn_points(pct: f64) -> u32 {
    if pct < 2.0 {
        25
    } else if pct < 5.0 {
        20
    } else if pct < 10.0 {
        10
    } else {
        0
    }
}

fn acquisition_points(new_tenants: u64) -> u32 {
    match new_tenants {
        6.. => 25,
        3..=5 => 15,
        1..=2 => 10,
        0 => 0,
    }
}

fn scale_points(mrr: f64) -> u32 {
    if mrr > 100_000.0 {
        20
    } else if mrr > 50_000.0 {
        15
    } else if mrr > 10_000.0 {
        10
    } else {
        0
    }
}

pub fn compute_health_score(inputs: &HealthInputs) -> HealthScore {
    let breakdown = HealthBreakdown {
        growth: growth_points(inputs.mrr_growth_pct),
        churn: churn_points(inputs.churn_rate_pct),
        acquisition: acquisition_points(inputs.new_tenants_this_month),
        scale: scale_points(inputs.mrr),
    };
    let score = breakdown.growth + breakdown.churn + breakdown.acquisition + breakdown.scale;
    HealthScore {
        score,
        label: HealthLabel::from_score(score),
        breakdown,
    }
}
