//! Assembly of every dashboard panel from a filtered selection.
//!
//! [`build_dashboard`] composes the aggregation queries into one
//! [`DashboardReport`] of plain serializable data for the presentation layer.

use analytics_core::formatting::{percentage, round_to};
use analytics_core::models::DerivedRecord;
use analytics_core::quantile::HIGH_VALUE_QUANTILE;
use analytics_core::segments::{ActivitySegment, SpendSegment};
use analytics_core::settings::{DEFAULT_CHURN_ROWS, DEFAULT_TOP_N};
use serde::{Deserialize, Serialize};

use crate::aggregator::{
    CategoryField, DateField, GroupProfile, NumericField, RecordAggregator, SegmentCount,
};

/// Revenue above which a player counts towards the premium share.
pub const PREMIUM_REVENUE_THRESHOLD: f64 = 100.0;

/// Columns per selected player behind the data-point count: every derived
/// column plus the signup-month and cohort-month bucket keys.
pub const DATA_POINT_COLUMNS: usize = DerivedRecord::COLUMN_COUNT + 2;

// ── Options ───────────────────────────────────────────────────────────────────

/// Tunables for the ranked and quantile panels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashboardOptions {
    pub top_n: usize,
    pub churn_rows: usize,
    pub high_value_quantile: f64,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            churn_rows: DEFAULT_CHURN_ROWS,
            high_value_quantile: HIGH_VALUE_QUANTILE,
        }
    }
}

// ── Panels ────────────────────────────────────────────────────────────────────

/// A count together with its share of all selected players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricShare {
    pub count: usize,
    /// Percent of selected players, one decimal; 0 for an empty selection.
    pub percent: f64,
}

impl MetricShare {
    fn of(count: usize, total: usize) -> Self {
        Self {
            count,
            percent: percentage(count as f64, total as f64, 1),
        }
    }
}

/// Headline metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub total_users: usize,
    pub daily_active: MetricShare,
    /// Daily plus weekly active.
    pub weekly_active: MetricShare,
    /// Every player seen within 30 days.
    pub monthly_active: MetricShare,
    pub total_revenue: f64,
    pub avg_revenue: Option<f64>,
    /// Same as `monthly_active.percent`.
    pub retention_rate: f64,
}

/// One `(label, value)` pair of a categorical chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryValue {
    pub key: String,
    pub value: f64,
}

/// One point of a monthly series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub period: String,
    pub value: f64,
}

/// One dot of the revenue-versus-sessions scatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementPoint {
    pub username: String,
    pub game_title: String,
    pub device_type: String,
    pub play_sessions: u64,
    pub revenue_usd: f64,
    pub days_since_signup: Option<i64>,
}

/// Row of the top-spenders table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopUserRow {
    pub username: String,
    pub total_revenue_usd: f64,
    pub game_title: String,
    pub device_type: String,
    pub total_play_sessions: u64,
    pub subscription_tier: String,
    pub activity_segment: ActivitySegment,
}

impl From<&DerivedRecord> for TopUserRow {
    fn from(r: &DerivedRecord) -> Self {
        Self {
            username: r.user.username.clone(),
            total_revenue_usd: round_to(r.revenue(), 2),
            game_title: r.user.game_title.clone(),
            device_type: r.user.device_type.clone(),
            total_play_sessions: r.sessions(),
            subscription_tier: r.user.subscription_tier.clone(),
            activity_segment: r.activity_segment,
        }
    }
}

/// Profile of the players above the revenue quantile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighValueSummary {
    pub quantile: f64,
    /// Revenue at the quantile; `None` for an empty selection.
    pub threshold: Option<f64>,
    pub count: usize,
    pub avg_revenue: Option<f64>,
    pub avg_sessions: Option<f64>,
    pub top_game: Option<String>,
    pub top_device: Option<String>,
    pub top_game_mode: Option<String>,
}

/// Row of the churn-risk table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnRiskRow {
    pub username: String,
    pub days_since_login: i64,
    pub total_revenue_usd: f64,
    pub total_play_sessions: u64,
    pub subscription_tier: String,
    pub game_title: String,
}

/// Churn alert panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnSummary {
    pub at_risk_users: usize,
    pub revenue_at_risk: f64,
    pub avg_days_inactive: Option<f64>,
    /// Highest-revenue at-risk players, truncated to the configured length.
    pub rows: Vec<ChurnRiskRow>,
}

/// Signup cohort for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRow {
    pub cohort_month: String,
    pub new_users: usize,
    pub revenue: f64,
}

/// Headline findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub retention_percent: f64,
    /// Share of players with revenue above [`PREMIUM_REVENUE_THRESHOLD`].
    pub premium_user_percent: f64,
    pub top_game_by_revenue: Option<String>,
    pub best_device_by_avg_revenue: Option<String>,
}

/// Size of the current selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub users_analyzed: usize,
    pub data_points: usize,
    pub games_covered: usize,
    pub device_types_covered: usize,
}

/// Everything the dashboard shows for one filter state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub kpis: KeyMetrics,
    pub revenue_by_game: Vec<CategoryValue>,
    pub monthly_revenue: Vec<SeriesPoint>,
    pub device_profile: Vec<GroupProfile>,
    pub game_mode_profile: Vec<GroupProfile>,
    pub subscription_profile: Vec<GroupProfile>,
    pub activity_segments: Vec<SegmentCount<ActivitySegment>>,
    pub spend_segments: Vec<SegmentCount<SpendSegment>>,
    pub engagement_points: Vec<EngagementPoint>,
    pub top_users: Vec<TopUserRow>,
    pub high_value: HighValueSummary,
    pub churn_risk: ChurnSummary,
    pub cohorts: Vec<CohortRow>,
    pub insights: Insights,
    pub stats: DatasetStats,
}

// ── Assembly ──────────────────────────────────────────────────────────────────

/// Compute every panel over `records` (already filtered).
pub fn build_dashboard(records: &[DerivedRecord], options: &DashboardOptions) -> DashboardReport {
    let kpis = key_metrics(records);

    let revenue_by_game =
        RecordAggregator::group_by(records, CategoryField::GameTitle, NumericField::Revenue);
    let device_revenue =
        RecordAggregator::group_by(records, CategoryField::DeviceType, NumericField::Revenue);

    let insights = Insights {
        retention_percent: kpis.retention_rate,
        premium_user_percent: percentage(
            records
                .iter()
                .filter(|r| r.revenue() > PREMIUM_REVENUE_THRESHOLD)
                .count() as f64,
            records.len() as f64,
            1,
        ),
        top_game_by_revenue: RecordAggregator::arg_max(&revenue_by_game, |g| Some(g.sum))
            .map(str::to_string),
        best_device_by_avg_revenue: RecordAggregator::arg_max(&device_revenue, |g| g.mean)
            .map(str::to_string),
    };

    let monthly_revenue =
        RecordAggregator::group_by_month(records, DateField::SignupDate, NumericField::Revenue);

    DashboardReport {
        revenue_by_game: revenue_by_game
            .into_iter()
            .map(|g| CategoryValue {
                key: g.key,
                value: g.sum,
            })
            .collect(),
        monthly_revenue: monthly_revenue
            .iter()
            .map(|p| SeriesPoint {
                period: p.period.clone(),
                value: p.sum,
            })
            .collect(),
        device_profile: RecordAggregator::group_profile(records, CategoryField::DeviceType),
        game_mode_profile: RecordAggregator::group_profile(records, CategoryField::GameMode),
        subscription_profile: RecordAggregator::group_profile(
            records,
            CategoryField::SubscriptionTier,
        ),
        activity_segments: RecordAggregator::activity_segment_counts(records),
        spend_segments: RecordAggregator::spend_segment_counts(records),
        engagement_points: records
            .iter()
            .map(|r| EngagementPoint {
                username: r.user.username.clone(),
                game_title: r.user.game_title.clone(),
                device_type: r.user.device_type.clone(),
                play_sessions: r.sessions(),
                revenue_usd: r.revenue(),
                days_since_signup: r.days_since_signup,
            })
            .collect(),
        top_users: RecordAggregator::top_n(records, NumericField::Revenue, options.top_n)
            .into_iter()
            .map(TopUserRow::from)
            .collect(),
        high_value: high_value_summary(records, options.high_value_quantile),
        churn_risk: churn_summary(records, options.churn_rows),
        cohorts: monthly_revenue
            .into_iter()
            .map(|p| CohortRow {
                cohort_month: p.period,
                new_users: p.unique_users,
                revenue: p.sum,
            })
            .collect(),
        stats: DatasetStats {
            users_analyzed: records.len(),
            data_points: records.len() * DATA_POINT_COLUMNS,
            games_covered: RecordAggregator::distinct_count(records, CategoryField::GameTitle),
            device_types_covered: RecordAggregator::distinct_count(
                records,
                CategoryField::DeviceType,
            ),
        },
        kpis,
        insights,
    }
}

fn key_metrics(records: &[DerivedRecord]) -> KeyMetrics {
    let total = records.len();
    let count = |pred: fn(ActivitySegment) -> bool| {
        records.iter().filter(|r| pred(r.activity_segment)).count()
    };

    let daily = count(|s| s == ActivitySegment::DailyActive);
    let weekly = count(|s| {
        matches!(
            s,
            ActivitySegment::DailyActive | ActivitySegment::WeeklyActive
        )
    });
    let monthly = MetricShare::of(count(|s| s.is_active()), total);

    KeyMetrics {
        total_users: total,
        daily_active: MetricShare::of(daily, total),
        weekly_active: MetricShare::of(weekly, total),
        retention_rate: monthly.percent,
        monthly_active: monthly,
        total_revenue: RecordAggregator::sum(records, NumericField::Revenue),
        avg_revenue: RecordAggregator::mean(records, NumericField::Revenue),
    }
}

fn high_value_summary(records: &[DerivedRecord], q: f64) -> HighValueSummary {
    let high = RecordAggregator::above_quantile(records, NumericField::Revenue, q);
    let mode = |field| RecordAggregator::mode(high.iter().copied(), field);

    HighValueSummary {
        quantile: q,
        threshold: RecordAggregator::quantile_threshold(records, NumericField::Revenue, q),
        count: high.len(),
        avg_revenue: RecordAggregator::mean_of(&high, NumericField::Revenue),
        avg_sessions: RecordAggregator::mean_of(&high, NumericField::PlaySessions),
        top_game: mode(CategoryField::GameTitle),
        top_device: mode(CategoryField::DeviceType),
        top_game_mode: mode(CategoryField::GameMode),
    }
}

fn churn_summary(records: &[DerivedRecord], rows: usize) -> ChurnSummary {
    let at_risk = RecordAggregator::churn_risk(records);

    ChurnSummary {
        at_risk_users: at_risk.len(),
        revenue_at_risk: at_risk.iter().map(|r| r.revenue()).sum(),
        avg_days_inactive: RecordAggregator::mean_of(&at_risk, NumericField::DaysSinceLogin),
        rows: at_risk
            .iter()
            .take(rows)
            .map(|r| ChurnRiskRow {
                username: r.user.username.clone(),
                days_since_login: r.days_since_login.unwrap_or_default(),
                total_revenue_usd: round_to(r.revenue(), 2),
                total_play_sessions: r.sessions(),
                subscription_tier: r.user.subscription_tier.clone(),
                game_title: r.user.game_title.clone(),
            })
            .collect(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
