use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{AnalyticsError, Result};

const SECONDS_PER_DAY: i64 = 86_400;

/// Cell values treated as an explicitly missing timestamp.
const NULL_TOKENS: &[&str] = &["nan", "nat", "null", "none", "n/a"];

/// Naive date-time patterns tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only patterns; the time is set to midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Validate that `tz_name` is a recognised IANA timezone identifier.
pub fn validate_timezone(tz_name: &str) -> bool {
    tz_name.parse::<Tz>().is_ok()
}

// ── Timestamp parsing ─────────────────────────────────────────────────────────

/// `true` for blank cells and the usual spreadsheet null spellings.
pub fn is_missing(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.is_empty() || NULL_TOKENS.contains(&trimmed.to_ascii_lowercase().as_str())
}

/// Parse a timestamp cell into a naive date-time.
///
/// Offset-carrying values (RFC 3339, including the `Z` suffix) are converted
/// to UTC before the offset is dropped. Date-only values map to midnight.
/// Returns `None` for empty or unrecognised input.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Parse a user-supplied calendar date (filter bounds, CLI flags).
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    parse_timestamp(s)
        .map(|dt| dt.date())
        .ok_or_else(|| AnalyticsError::InvalidDate(s.trim().to_string()))
}

// ── Reference time ────────────────────────────────────────────────────────────

/// Resolve the reference "today" used by the derivation engine.
///
/// An explicit value wins. Otherwise `now` is converted into `tz_name` and
/// its local wall-clock time is used; an unknown timezone falls back to UTC
/// with a warning.
pub fn resolve_reference_time(
    explicit: Option<&str>,
    tz_name: &str,
    now: DateTime<Utc>,
) -> Result<NaiveDateTime> {
    if let Some(value) = explicit {
        return parse_timestamp(value)
            .ok_or_else(|| AnalyticsError::InvalidDate(value.trim().to_string()));
    }

    let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", tz_name);
        Tz::UTC
    });
    Ok(now.with_timezone(&tz).naive_local())
}

/// Whole days from `then` to `reference`, floored towards negative infinity.
///
/// A timestamp nine hours after the reference is `-1` days, matching how
/// timedelta day components behave for negative spans.
pub fn days_between(reference: NaiveDateTime, then: NaiveDateTime) -> i64 {
    (reference - then).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Calendar-month key (`"%Y-%m"`) for a timestamp.
pub fn month_key(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m").to_string()
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    // ── parse_timestamp ──────────────────────────────────────────────────────

    #[test]
    fn test_parse_date_only() {
        assert_eq!(parse_timestamp("2024-03-05"), Some(dt("2024-03-05 00:00:00")));
        assert_eq!(parse_timestamp("03/05/2024"), Some(dt("2024-03-05 00:00:00")));
    }

    #[test]
    fn test_parse_naive_datetime_variants() {
        assert_eq!(
            parse_timestamp("2024-03-05 14:30:00"),
            Some(dt("2024-03-05 14:30:00"))
        );
        assert_eq!(
            parse_timestamp("2024-03-05T14:30:00"),
            Some(dt("2024-03-05 14:30:00"))
        );
        assert_eq!(parse_timestamp("2024-03-05 14:30"), Some(dt("2024-03-05 14:30:00")));
        assert_eq!(
            parse_timestamp("3/5/2024 14:30"),
            Some(dt("2024-03-05 14:30:00"))
        );
    }

    #[test]
    fn test_parse_rfc3339_converted_to_utc() {
        assert_eq!(
            parse_timestamp("2024-03-05T14:30:00Z"),
            Some(dt("2024-03-05 14:30:00"))
        );
        assert_eq!(
            parse_timestamp("2024-03-05T14:30:00+02:00"),
            Some(dt("2024-03-05 12:30:00"))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-40"), None);
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing(""));
        assert!(is_missing("  "));
        assert!(is_missing("NaN"));
        assert!(is_missing("NaT"));
        assert!(is_missing("null"));
        assert!(!is_missing("2024-01-01"));
        assert!(!is_missing("garbage"));
    }

    #[test]
    fn test_parse_date_error() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        let err = parse_date("not a date").unwrap_err();
        assert_eq!(err.to_string(), "Invalid date: not a date");
    }

    // ── resolve_reference_time ───────────────────────────────────────────────

    #[test]
    fn test_reference_time_explicit_wins() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let reference = resolve_reference_time(Some("2024-06-30"), "UTC", now).unwrap();
        assert_eq!(reference, dt("2024-06-30 00:00:00"));
    }

    #[test]
    fn test_reference_time_explicit_invalid() {
        let now = Utc::now();
        assert!(resolve_reference_time(Some("soon"), "UTC", now).is_err());
    }

    #[test]
    fn test_reference_time_uses_timezone() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 23, 0, 0).unwrap();
        let tokyo = resolve_reference_time(None, "Asia/Tokyo", now).unwrap();
        assert_eq!(tokyo, dt("2024-07-01 08:00:00"));
        let utc = resolve_reference_time(None, "UTC", now).unwrap();
        assert_eq!(utc, dt("2024-06-30 23:00:00"));
    }

    #[test]
    fn test_reference_time_unknown_timezone_falls_back_to_utc() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 23, 0, 0).unwrap();
        let reference = resolve_reference_time(None, "Mars/Olympus", now).unwrap();
        assert_eq!(reference, dt("2024-06-30 23:00:00"));
    }

    #[test]
    fn test_validate_timezone() {
        assert!(validate_timezone("Europe/Berlin"));
        assert!(validate_timezone("UTC"));
        assert!(!validate_timezone("Not/AZone"));
    }

    // ── days_between ─────────────────────────────────────────────────────────

    #[test]
    fn test_days_between_floors() {
        let reference = dt("2024-01-10 15:00:00");
        assert_eq!(days_between(reference, dt("2024-01-10 00:00:00")), 0);
        assert_eq!(days_between(reference, dt("2024-01-09 16:00:00")), 0);
        assert_eq!(days_between(reference, dt("2024-01-09 15:00:00")), 1);
        assert_eq!(days_between(reference, dt("2023-12-31 00:00:00")), 10);
    }

    #[test]
    fn test_days_between_future_is_negative() {
        let reference = dt("2024-01-10 15:00:00");
        assert_eq!(days_between(reference, dt("2024-01-11 00:00:00")), -1);
        assert_eq!(days_between(reference, dt("2024-01-13 00:00:00")), -3);
    }

    #[test]
    fn test_month_key() {
        assert_eq!(month_key(dt("2024-02-29 23:59:59")), "2024-02");
    }
}
