use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::segments::{ActivitySegment, SpendSegment};

/// Column names the loader requires in the header row.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "User_ID",
    "Username",
    "Game_Title",
    "Device_Type",
    "Preferred_Game_Mode",
    "Subscription_Tier",
    "Signup_Date",
    "Last_Login",
    "Total_Revenue_USD",
    "Total_Play_Sessions",
];

/// One player row as read from the source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique key.
    pub user_id: String,
    /// Display name; not guaranteed unique.
    pub username: String,
    pub game_title: String,
    pub device_type: String,
    pub preferred_game_mode: String,
    pub subscription_tier: String,
    /// `None` when the cell was missing or unparseable.
    pub signup_date: Option<NaiveDateTime>,
    /// `None` when the cell was missing or unparseable.
    pub last_login: Option<NaiveDateTime>,
    /// Lifetime revenue in US dollars, always finite and non-negative.
    pub total_revenue_usd: f64,
    pub total_play_sessions: u64,
}

/// A [`UserRecord`] plus the fields computed by the derivation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRecord {
    #[serde(flatten)]
    pub user: UserRecord,
    /// Whole days between `last_login` and the reference time, floored.
    /// Negative when the login lies in the future.
    pub days_since_login: Option<i64>,
    /// Whole days between `signup_date` and the reference time, floored.
    pub days_since_signup: Option<i64>,
    /// Revenue divided by sessions, with zero sessions counted as one.
    pub revenue_per_session: f64,
    pub activity_segment: ActivitySegment,
    pub spend_segment: SpendSegment,
}

impl DerivedRecord {
    /// Number of columns a derived row exposes to the presentation layer.
    pub const COLUMN_COUNT: usize = 15;

    pub fn user_id(&self) -> &str {
        &self.user.user_id
    }

    pub fn revenue(&self) -> f64 {
        self.user.total_revenue_usd
    }

    pub fn sessions(&self) -> u64 {
        self.user.total_play_sessions
    }
}

// ── ParseWarning ──────────────────────────────────────────────────────────────

/// A non-fatal problem found while loading a single row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// A date cell held a value that matched no known format; the field was
    /// recorded as null.
    UnparseableDate {
        row: usize,
        user_id: String,
        column: String,
        value: String,
    },
    /// A later row reused an existing `User_ID` and was dropped.
    DuplicateUserId { row: usize, user_id: String },
}

impl ParseWarning {
    /// 1-based data row the warning refers to.
    pub fn row(&self) -> usize {
        match self {
            ParseWarning::UnparseableDate { row, .. } | ParseWarning::DuplicateUserId { row, .. } => {
                *row
            }
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::UnparseableDate {
                row,
                user_id,
                column,
                value,
            } => write!(
                f,
                "row {row} (user {user_id}): unparseable {column} {value:?}, treated as missing"
            ),
            ParseWarning::DuplicateUserId { row, user_id } => {
                write!(f, "row {row}: duplicate user id {user_id}, row dropped")
            }
        }
    }
}
