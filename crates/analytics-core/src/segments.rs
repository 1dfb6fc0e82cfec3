//! Fixed bin tables for the activity and spend segmentations.
//!
//! Both tables are right-closed: a value belongs to the first bin whose upper
//! edge it does not exceed, and values at or below the table's lower edge
//! fall outside every bin.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Binning ───────────────────────────────────────────────────────────────────

/// Place `value` into the right-closed bins `(lower, e0], (e0, e1], ...`.
///
/// Returns `None` for values `<= lower` and for NaN.
pub fn bin_value<T: Copy>(value: f64, lower: f64, edges: &[(f64, T)]) -> Option<T> {
    if value.is_nan() || value <= lower {
        return None;
    }
    edges
        .iter()
        .find(|(upper, _)| value <= *upper)
        .map(|(_, label)| *label)
}

/// Lower edge of the activity table (exclusive).
pub const ACTIVITY_LOWER_EDGE: f64 = -1.0;

/// Upper edges of the activity table, in days since last login.
pub const ACTIVITY_BINS: &[(f64, ActivitySegment)] = &[
    (1.0, ActivitySegment::DailyActive),
    (7.0, ActivitySegment::WeeklyActive),
    (30.0, ActivitySegment::MonthlyActive),
    (f64::INFINITY, ActivitySegment::Inactive),
];

/// Lower edge of the spend table (exclusive). Zero revenue is unclassified.
pub const SPEND_LOWER_EDGE: f64 = 0.0;

/// Upper edges of the spend table, in USD.
pub const SPEND_BINS: &[(f64, SpendSegment)] = &[
    (10.0, SpendSegment::LowSpender),
    (50.0, SpendSegment::MediumSpender),
    (200.0, SpendSegment::HighSpender),
    (f64::INFINITY, SpendSegment::Whale),
];

/// Days since last login above which a user counts as a churn risk.
pub const CHURN_RISK_DAYS: i64 = 30;

// ── ActivitySegment ───────────────────────────────────────────────────────────

/// Recency-of-login segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActivitySegment {
    #[serde(rename = "Daily Active")]
    DailyActive,
    #[serde(rename = "Weekly Active")]
    WeeklyActive,
    #[serde(rename = "Monthly Active")]
    MonthlyActive,
    #[serde(rename = "Inactive")]
    Inactive,
    /// No login date, or a login more than a day in the future.
    #[serde(rename = "Unclassified")]
    Unclassified,
}

impl ActivitySegment {
    /// Every segment value in display order.
    pub const ALL: [ActivitySegment; 5] = [
        ActivitySegment::DailyActive,
        ActivitySegment::WeeklyActive,
        ActivitySegment::MonthlyActive,
        ActivitySegment::Inactive,
        ActivitySegment::Unclassified,
    ];

    /// Classify a `days_since_login` value.
    pub fn from_days_since_login(days: Option<i64>) -> Self {
        days.and_then(|d| bin_value(d as f64, ACTIVITY_LOWER_EDGE, ACTIVITY_BINS))
            .unwrap_or(ActivitySegment::Unclassified)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivitySegment::DailyActive => "Daily Active",
            ActivitySegment::WeeklyActive => "Weekly Active",
            ActivitySegment::MonthlyActive => "Monthly Active",
            ActivitySegment::Inactive => "Inactive",
            ActivitySegment::Unclassified => "Unclassified",
        }
    }

    /// Logged in within the last 30 days.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ActivitySegment::DailyActive
                | ActivitySegment::WeeklyActive
                | ActivitySegment::MonthlyActive
        )
    }
}

impl fmt::Display for ActivitySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── SpendSegment ──────────────────────────────────────────────────────────────

/// Lifetime-revenue segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpendSegment {
    #[serde(rename = "Low Spender")]
    LowSpender,
    #[serde(rename = "Medium Spender")]
    MediumSpender,
    #[serde(rename = "High Spender")]
    HighSpender,
    #[serde(rename = "Whale")]
    Whale,
    /// Zero revenue.
    #[serde(rename = "Unclassified")]
    Unclassified,
}

impl SpendSegment {
    pub const ALL: [SpendSegment; 5] = [
        SpendSegment::LowSpender,
        SpendSegment::MediumSpender,
        SpendSegment::HighSpender,
        SpendSegment::Whale,
        SpendSegment::Unclassified,
    ];

    /// Classify a lifetime revenue amount.
    pub fn from_revenue(revenue_usd: f64) -> Self {
        bin_value(revenue_usd, SPEND_LOWER_EDGE, SPEND_BINS).unwrap_or(SpendSegment::Unclassified)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SpendSegment::LowSpender => "Low Spender",
            SpendSegment::MediumSpender => "Medium Spender",
            SpendSegment::HighSpender => "High Spender",
            SpendSegment::Whale => "Whale",
            SpendSegment::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for SpendSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
