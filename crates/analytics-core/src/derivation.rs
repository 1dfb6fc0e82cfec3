//! Per-record derived metrics and segmentation.
//!
//! Every derived field is a pure function of its own record and the
//! reference time passed in by the caller; nothing here reads the clock.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::models::{DerivedRecord, UserRecord};
use crate::segments::{ActivitySegment, SpendSegment};
use crate::time_utils::days_between;

/// Revenue per play session, counting zero sessions as one.
pub fn revenue_per_session(revenue_usd: f64, sessions: u64) -> f64 {
    revenue_usd / sessions.max(1) as f64
}

/// Derive a single record.
pub fn derive_record(record: &UserRecord, reference: NaiveDateTime) -> DerivedRecord {
    let days_since_login = record.last_login.map(|ts| days_between(reference, ts));
    let days_since_signup = record.signup_date.map(|ts| days_between(reference, ts));

    DerivedRecord {
        user: record.clone(),
        days_since_login,
        days_since_signup,
        revenue_per_session: revenue_per_session(
            record.total_revenue_usd,
            record.total_play_sessions,
        ),
        activity_segment: ActivitySegment::from_days_since_login(days_since_login),
        spend_segment: SpendSegment::from_revenue(record.total_revenue_usd),
    }
}

/// Derive every record against the same reference time, preserving order.
pub fn derive(records: &[UserRecord], reference: NaiveDateTime) -> Vec<DerivedRecord> {
    let derived: Vec<DerivedRecord> = records
        .iter()
        .map(|r| derive_record(r, reference))
        .collect();

    let unclassified = derived
        .iter()
        .filter(|r| r.activity_segment == ActivitySegment::Unclassified)
        .count();
    debug!(
        records = derived.len(),
        unclassified_activity = unclassified,
        reference = %reference,
        "derived records"
    );

    derived
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn reference() -> NaiveDateTime {
        ts("2024-06-30 12:00:00")
    }

    fn user(id: &str, revenue: f64, sessions: u64, last_login: Option<&str>) -> UserRecord {
        UserRecord {
            user_id: id.to_string(),
            username: format!("player_{id}"),
            game_title: "Star Quest".to_string(),
            device_type: "PC".to_string(),
            preferred_game_mode: "Solo".to_string(),
            subscription_tier: "Free".to_string(),
            signup_date: Some(ts("2024-01-15 00:00:00")),
            last_login: last_login.map(ts),
            total_revenue_usd: revenue,
            total_play_sessions: sessions,
        }
    }

    #[test]
    fn test_revenue_per_session_scenario() {
        let records = vec![
            user("1", 100.0, 2, None),
            user("2", 0.0, 0, None),
            user("3", 50.0, 5, None),
        ];
        let rps: Vec<f64> = derive(&records, reference())
            .iter()
            .map(|r| r.revenue_per_session)
            .collect();
        assert_eq!(rps, vec![50.0, 0.0, 10.0]);
    }

    #[test]
    fn test_zero_sessions_divides_by_one() {
        assert_eq!(revenue_per_session(37.5, 0), 37.5);
        assert_eq!(revenue_per_session(37.5, 1), 37.5);
        assert!((revenue_per_session(10.0, 3) - 10.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_days_and_activity_segment() {
        let records = vec![
            user("a", 5.0, 1, Some("2024-06-30 08:00:00")),
            user("b", 5.0, 1, Some("2024-06-25 12:00:00")),
            user("c", 5.0, 1, Some("2024-06-10 12:00:00")),
            user("d", 5.0, 1, Some("2024-05-21 12:00:00")),
        ];
        let derived = derive(&records, reference());

        let days: Vec<Option<i64>> = derived.iter().map(|r| r.days_since_login).collect();
        assert_eq!(days, vec![Some(0), Some(5), Some(20), Some(40)]);

        let segments: Vec<ActivitySegment> =
            derived.iter().map(|r| r.activity_segment).collect();
        assert_eq!(
            segments,
            vec![
                ActivitySegment::DailyActive,
                ActivitySegment::WeeklyActive,
                ActivitySegment::MonthlyActive,
                ActivitySegment::Inactive,
            ]
        );
    }

    #[test]
    fn test_null_login_is_unclassified() {
        let derived = derive_record(&user("x", 12.0, 3, None), reference());
        assert_eq!(derived.days_since_login, None);
        assert_eq!(derived.activity_segment, ActivitySegment::Unclassified);
        assert_eq!(derived.days_since_signup, Some(167));
    }

    #[test]
    fn test_future_login_preserved_negative() {
        let derived = derive_record(&user("f", 1.0, 1, Some("2024-07-03 12:00:00")), reference());
        assert_eq!(derived.days_since_login, Some(-3));
        assert_eq!(derived.activity_segment, ActivitySegment::Unclassified);

        // Later the same day still rounds down to -1, which is outside every bin.
        let derived = derive_record(&user("g", 1.0, 1, Some("2024-06-30 18:00:00")), reference());
        assert_eq!(derived.days_since_login, Some(-1));
        assert_eq!(derived.activity_segment, ActivitySegment::Unclassified);
    }

    #[test]
    fn test_spend_segment_assigned() {
        let derived = derive(
            &[
                user("1", 0.0, 1, None),
                user("2", 9.99, 1, None),
                user("3", 250.0, 1, None),
            ],
            reference(),
        );
        let spend: Vec<SpendSegment> = derived.iter().map(|r| r.spend_segment).collect();
        assert_eq!(
            spend,
            vec![
                SpendSegment::Unclassified,
                SpendSegment::LowSpender,
                SpendSegment::Whale,
            ]
        );
    }

    #[test]
    fn test_derive_is_deterministic() {
        let records = vec![
            user("1", 10.0, 2, Some("2024-06-01 00:00:00")),
            user("2", 300.0, 0, None),
        ];
        assert_eq!(derive(&records, reference()), derive(&records, reference()));
    }

    #[test]
    fn test_derive_keeps_source_fields() {
        let record = user("k", 42.0, 6, Some("2024-06-29 12:00:00"));
        let derived = derive_record(&record, reference());
        assert_eq!(derived.user, record);
        assert!(derived.revenue_per_session >= 0.0);
    }
}
