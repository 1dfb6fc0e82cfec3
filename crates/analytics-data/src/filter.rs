//! Record selection by game, device and signup date.

use std::collections::{BTreeSet, HashSet};

use analytics_core::models::DerivedRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── DateRange ─────────────────────────────────────────────────────────────────

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `true` when `date` lies within `[start, end]`. Always `false` when
    /// `start > end`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ── FilterOptions ─────────────────────────────────────────────────────────────

/// The choices a dashboard offers for each filter control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Distinct game titles in first-seen order.
    pub game_titles: Vec<String>,
    /// Distinct device types in first-seen order.
    pub device_types: Vec<String>,
    /// Earliest and latest signup date, `None` when no record has one.
    pub signup_range: Option<DateRange>,
}

impl FilterOptions {
    pub fn from_records(records: &[DerivedRecord]) -> Self {
        let mut game_titles = Vec::new();
        let mut device_types = Vec::new();
        let mut seen_games = HashSet::new();
        let mut seen_devices = HashSet::new();
        let mut signup_range: Option<DateRange> = None;

        for record in records {
            let user = &record.user;
            if seen_games.insert(user.game_title.as_str()) {
                game_titles.push(user.game_title.clone());
            }
            if seen_devices.insert(user.device_type.as_str()) {
                device_types.push(user.device_type.clone());
            }
            if let Some(date) = user.signup_date.map(|ts| ts.date()) {
                signup_range = Some(match signup_range {
                    None => DateRange::new(date, date),
                    Some(r) => DateRange::new(r.start.min(date), r.end.max(date)),
                });
            }
        }

        Self {
            game_titles,
            device_types,
            signup_range,
        }
    }
}

// ── FilterCriteria ────────────────────────────────────────────────────────────

/// A conjunction of set-membership and signup-date predicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub game_titles: BTreeSet<String>,
    pub device_types: BTreeSet<String>,
    pub signup_range: DateRange,
}

impl FilterCriteria {
    pub fn new(
        game_titles: impl IntoIterator<Item = String>,
        device_types: impl IntoIterator<Item = String>,
        signup_range: DateRange,
    ) -> Self {
        Self {
            game_titles: game_titles.into_iter().collect(),
            device_types: device_types.into_iter().collect(),
            signup_range,
        }
    }

    /// Every title, every device and the full signup range.
    ///
    /// Returns `None` when no record has a signup date; with no range to
    /// select, every date-bounded view is empty anyway.
    pub fn select_all(options: &FilterOptions) -> Option<Self> {
        let range = options.signup_range?;
        Some(Self::new(
            options.game_titles.iter().cloned(),
            options.device_types.iter().cloned(),
            range,
        ))
    }

    /// `true` when `record` satisfies every predicate.
    ///
    /// A record without a signup date never matches a date-bounded view.
    pub fn matches(&self, record: &DerivedRecord) -> bool {
        let user = &record.user;
        let Some(signup) = user.signup_date else {
            return false;
        };
        self.game_titles.contains(&user.game_title)
            && self.device_types.contains(&user.device_type)
            && self.signup_range.contains(signup.date())
    }
}

/// Select the records matching `criteria`, preserving input order.
///
/// Empty title or device sets select nothing.
pub fn filter_records(records: &[DerivedRecord], criteria: &FilterCriteria) -> Vec<DerivedRecord> {
    let selected: Vec<DerivedRecord> = records
        .iter()
        .filter(|r| criteria.matches(r))
        .cloned()
        .collect();
    tracing::debug!(
        input = records.len(),
        selected = selected.len(),
        "filtered records"
    );
    selected
}

// ── Tests ─────────────────────────────────────────────────────────────────────
