//! Grouped, bucketed and ranked summaries over a selection of players.
//!
//! Every function is a pure query over its input slice. Empty input always
//! produces a defined result: zero sums, empty tables or `None`.

use std::collections::{BTreeMap, HashMap, HashSet};

use analytics_core::formatting::round_to;
use analytics_core::models::DerivedRecord;
use analytics_core::quantile::quantile;
use analytics_core::segments::{ActivitySegment, SpendSegment, CHURN_RISK_DAYS};
use analytics_core::time_utils::month_key;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ── Field selectors ───────────────────────────────────────────────────────────

/// Numeric columns that can be summed, averaged or ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Revenue,
    PlaySessions,
    RevenuePerSession,
    DaysSinceLogin,
    DaysSinceSignup,
}

impl NumericField {
    /// The field's value, `None` when it is null for this record.
    pub fn value(self, record: &DerivedRecord) -> Option<f64> {
        match self {
            NumericField::Revenue => Some(record.user.total_revenue_usd),
            NumericField::PlaySessions => Some(record.user.total_play_sessions as f64),
            NumericField::RevenuePerSession => Some(record.revenue_per_session),
            NumericField::DaysSinceLogin => record.days_since_login.map(|d| d as f64),
            NumericField::DaysSinceSignup => record.days_since_signup.map(|d| d as f64),
        }
    }
}

/// Categorical columns that can be grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryField {
    GameTitle,
    DeviceType,
    GameMode,
    SubscriptionTier,
    ActivitySegment,
    SpendSegment,
}

impl CategoryField {
    pub fn value(self, record: &DerivedRecord) -> &str {
        match self {
            CategoryField::GameTitle => &record.user.game_title,
            CategoryField::DeviceType => &record.user.device_type,
            CategoryField::GameMode => &record.user.preferred_game_mode,
            CategoryField::SubscriptionTier => &record.user.subscription_tier,
            CategoryField::ActivitySegment => record.activity_segment.label(),
            CategoryField::SpendSegment => record.spend_segment.label(),
        }
    }
}

/// Timestamp columns that can be bucketed by month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    SignupDate,
    LastLogin,
}

impl DateField {
    pub fn value(self, record: &DerivedRecord) -> Option<NaiveDateTime> {
        match self {
            DateField::SignupDate => record.user.signup_date,
            DateField::LastLogin => record.user.last_login,
        }
    }
}

// ── Result types ──────────────────────────────────────────────────────────────

/// Number of players in one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentCount<S> {
    pub segment: S,
    pub count: usize,
}

/// Sum, mean and count of a numeric field within one category value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub key: String,
    /// Records in the group.
    pub count: usize,
    /// Records in the group with a non-null value.
    pub value_count: usize,
    pub sum: f64,
    /// `None` when every value in the group is null.
    pub mean: Option<f64>,
}

/// Average revenue and sessions for one category value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupProfile {
    pub key: String,
    pub users: usize,
    pub avg_revenue: f64,
    pub avg_sessions: f64,
}

/// Aggregate of a numeric field within one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    /// `"%Y-%m"`.
    pub period: String,
    pub count: usize,
    /// Distinct user ids in the month.
    pub unique_users: usize,
    pub sum: f64,
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    value_count: usize,
    sum: f64,
}

impl Accumulator {
    fn add(&mut self, value: Option<f64>) {
        self.count += 1;
        if let Some(v) = value {
            self.value_count += 1;
            self.sum += v;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.value_count > 0).then(|| self.sum / self.value_count as f64)
    }
}

// ── RecordAggregator ──────────────────────────────────────────────────────────

/// Stateless query helpers over a slice of derived records.
pub struct RecordAggregator;

impl RecordAggregator {
    // ── Scalars ───────────────────────────────────────────────────────────

    /// Sum of the non-null values of `field`; `0.0` on empty input.
    pub fn sum(records: &[DerivedRecord], field: NumericField) -> f64 {
        records.iter().filter_map(|r| field.value(r)).sum()
    }

    /// Mean of the non-null values of `field`; `None` when there are none.
    pub fn mean(records: &[DerivedRecord], field: NumericField) -> Option<f64> {
        let mut acc = Accumulator::default();
        for record in records {
            acc.add(field.value(record));
        }
        acc.mean()
    }

    /// Mean over a borrowed selection, as returned by the ranking queries.
    pub fn mean_of(records: &[&DerivedRecord], field: NumericField) -> Option<f64> {
        let mut acc = Accumulator::default();
        for record in records {
            acc.add(field.value(record));
        }
        acc.mean()
    }

    /// Number of distinct values of `field`.
    pub fn distinct_count(records: &[DerivedRecord], field: CategoryField) -> usize {
        records
            .iter()
            .map(|r| field.value(r))
            .collect::<HashSet<_>>()
            .len()
    }

    // ── Segment counts ────────────────────────────────────────────────────

    /// Players per activity segment, every segment present, in display order.
    pub fn activity_segment_counts(
        records: &[DerivedRecord],
    ) -> Vec<SegmentCount<ActivitySegment>> {
        ActivitySegment::ALL
            .iter()
            .map(|&segment| SegmentCount {
                segment,
                count: records
                    .iter()
                    .filter(|r| r.activity_segment == segment)
                    .count(),
            })
            .collect()
    }

    /// Players per spend segment, every segment present, in display order.
    pub fn spend_segment_counts(records: &[DerivedRecord]) -> Vec<SegmentCount<SpendSegment>> {
        SpendSegment::ALL
            .iter()
            .map(|&segment| SegmentCount {
                segment,
                count: records.iter().filter(|r| r.spend_segment == segment).count(),
            })
            .collect()
    }

    // ── Grouping ──────────────────────────────────────────────────────────

    /// Group by `category` and aggregate `numeric`. Groups are sorted by key.
    pub fn group_by(
        records: &[DerivedRecord],
        category: CategoryField,
        numeric: NumericField,
    ) -> Vec<GroupStats> {
        let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
        for record in records {
            groups
                .entry(category.value(record))
                .or_default()
                .add(numeric.value(record));
        }

        groups
            .into_iter()
            .map(|(key, acc)| GroupStats {
                key: key.to_string(),
                count: acc.count,
                value_count: acc.value_count,
                sum: acc.sum,
                mean: acc.mean(),
            })
            .collect()
    }

    /// Mean revenue and mean sessions per `category` value, rounded to two
    /// decimals, sorted by key.
    pub fn group_profile(records: &[DerivedRecord], category: CategoryField) -> Vec<GroupProfile> {
        let revenue = Self::group_by(records, category, NumericField::Revenue);
        let sessions = Self::group_by(records, category, NumericField::PlaySessions);

        revenue
            .into_iter()
            .zip(sessions)
            .map(|(rev, ses)| GroupProfile {
                key: rev.key,
                users: rev.count,
                avg_revenue: round_to(rev.mean.unwrap_or_default(), 2),
                avg_sessions: round_to(ses.mean.unwrap_or_default(), 2),
            })
            .collect()
    }

    /// Key of the first group (in key order) with the largest `metric`.
    /// Groups whose metric is `None` are skipped.
    pub fn arg_max<'a>(
        groups: &'a [GroupStats],
        metric: impl Fn(&GroupStats) -> Option<f64>,
    ) -> Option<&'a str> {
        let mut best: Option<(&'a str, f64)> = None;
        for group in groups {
            let Some(value) = metric(group) else { continue };
            match best {
                Some((_, current)) if value <= current => {}
                _ => best = Some((group.key.as_str(), value)),
            }
        }
        best.map(|(key, _)| key)
    }

    /// Bucket by calendar month of `date` and sum `numeric`. Records with a
    /// null date are skipped. Periods are sorted chronologically.
    pub fn group_by_month(
        records: &[DerivedRecord],
        date: DateField,
        numeric: NumericField,
    ) -> Vec<PeriodStats> {
        let mut periods: BTreeMap<String, (Accumulator, HashSet<&str>)> = BTreeMap::new();
        for record in records {
            let Some(ts) = date.value(record) else {
                continue;
            };
            let (acc, users) = periods.entry(month_key(ts)).or_default();
            acc.add(numeric.value(record));
            users.insert(record.user_id());
        }

        periods
            .into_iter()
            .map(|(period, (acc, users))| PeriodStats {
                period,
                count: acc.count,
                unique_users: users.len(),
                sum: acc.sum,
            })
            .collect()
    }

    // ── Ranking and selection ─────────────────────────────────────────────

    /// The `n` records with the largest `field`, descending. Ties keep input
    /// order; records with a null value are not ranked.
    pub fn top_n(records: &[DerivedRecord], field: NumericField, n: usize) -> Vec<&DerivedRecord> {
        let mut ranked = Self::sorted_desc(records.iter(), field);
        ranked.truncate(n);
        ranked
    }

    /// The `q`-th quantile of `field` over `records`.
    pub fn quantile_threshold(
        records: &[DerivedRecord],
        field: NumericField,
        q: f64,
    ) -> Option<f64> {
        let values: Vec<f64> = records.iter().filter_map(|r| field.value(r)).collect();
        quantile(&values, q)
    }

    /// Records whose `field` is strictly above its `q`-th quantile, in input
    /// order.
    pub fn above_quantile(
        records: &[DerivedRecord],
        field: NumericField,
        q: f64,
    ) -> Vec<&DerivedRecord> {
        let Some(threshold) = Self::quantile_threshold(records, field, q) else {
            return Vec::new();
        };
        records
            .iter()
            .filter(|r| field.value(r).is_some_and(|v| v > threshold))
            .collect()
    }

    /// Most frequent value of `field`. Ties go to the value seen first;
    /// empty input has no mode.
    pub fn mode<'a, I>(records: I, field: CategoryField) -> Option<String>
    where
        I: IntoIterator<Item = &'a DerivedRecord>,
    {
        // value → (count, first position)
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (position, record) in records.into_iter().enumerate() {
            counts.entry(field.value(record)).or_insert((0, position)).0 += 1;
        }

        counts
            .into_iter()
            .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
                count_a.cmp(count_b).then(first_b.cmp(first_a))
            })
            .map(|(value, _)| value.to_string())
    }

    /// Players not seen for more than 30 days, highest revenue first.
    pub fn churn_risk(records: &[DerivedRecord]) -> Vec<&DerivedRecord> {
        let at_risk = records
            .iter()
            .filter(|r| r.days_since_login.is_some_and(|d| d > CHURN_RISK_DAYS));
        Self::sorted_desc(at_risk, NumericField::Revenue)
    }

    // ── Private ───────────────────────────────────────────────────────────

    /// Stable descending sort on `field`, dropping null values.
    fn sorted_desc<'a>(
        records: impl Iterator<Item = &'a DerivedRecord>,
        field: NumericField,
    ) -> Vec<&'a DerivedRecord> {
        let mut keyed: Vec<(f64, &DerivedRecord)> = records
            .filter_map(|r| field.value(r).map(|v| (v, r)))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| b.total_cmp(a));
        keyed.into_iter().map(|(_, r)| r).collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
