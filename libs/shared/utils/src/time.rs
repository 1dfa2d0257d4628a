//! Minute-of-day arithmetic used by availability and booking.
//!
//! Clinic wall-clock time is derived from UTC instants with a fixed hour
//! offset taken from configuration. The offset is not DST aware.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use thiserror::Error;

pub const MINUTES_PER_DAY: i32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("invalid time '{0}', expected HH:mm")]
    InvalidFormat(String),
}

/// Converts `"HH:mm"` into minutes since midnight.
pub fn time_to_minutes(time: &str) -> Result<i32, TimeError> {
    let invalid = || TimeError::InvalidFormat(time.to_string());

    let mut parts = time.split(':');
    let (Some(hours), Some(minutes), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };

    let hours = parse_numeric(hours).ok_or_else(invalid)?;
    let minutes = parse_numeric(minutes).ok_or_else(invalid)?;

    Ok(hours * 60 + minutes)
}

fn parse_numeric(part: &str) -> Option<i32> {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Formats minutes since midnight as zero-padded `"HH:mm"`.
///
/// Hours are `(minutes / 60) % 24`, so 1440 renders as `00:00`. Negative
/// input is not normalized; callers pass non-negative values.
pub fn minutes_to_time(minutes: i32) -> String {
    format!("{:02}:{:02}", (minutes / 60) % 24, minutes % 60)
}

/// Clinic-local minute of day for a UTC instant.
pub fn date_to_minutes(date: DateTime<Utc>, offset_hours: i32) -> i32 {
    let local_hour = (date.hour() as i32 + offset_hours).rem_euclid(24);
    local_hour * 60 + date.minute() as i32
}

/// True when the two instants are at most four hours apart, in either order.
pub fn is_less_than_four_hours(d1: DateTime<Utc>, d2: DateTime<Utc>) -> bool {
    (d1 - d2).num_milliseconds().abs() <= Duration::hours(4).num_milliseconds()
}

/// Clinic-local calendar day of a UTC instant.
pub fn local_date(instant: DateTime<Utc>, offset_hours: i32) -> NaiveDate {
    (instant + Duration::hours(offset_hours as i64)).date_naive()
}

/// UTC instant for `minutes` past clinic-local midnight of `date`.
pub fn local_to_utc(date: NaiveDate, minutes: i32, offset_hours: i32) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
        + Duration::minutes(minutes as i64)
        - Duration::hours(offset_hours as i64)
}

pub fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    #[test]
    fn parses_hh_mm() {
        assert_eq!(time_to_minutes("00:00"), Ok(0));
        assert_eq!(time_to_minutes("08:30"), Ok(510));
        assert_eq!(time_to_minutes("23:59"), Ok(1439));
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["", "0830", "08:", ":30", "ab:cd", "08:30:00", "-1:30", "8h:30"] {
            assert_matches!(time_to_minutes(bad), Err(TimeError::InvalidFormat(_)), "{bad}");
        }
    }

    #[test]
    fn formats_zero_padded() {
        assert_eq!(minutes_to_time(0), "00:00");
        assert_eq!(minutes_to_time(65), "01:05");
        assert_eq!(minutes_to_time(1439), "23:59");
        assert_eq!(minutes_to_time(1440), "00:00");
    }

    #[test]
    fn round_trips_every_minute_of_the_day() {
        for minutes in 0..MINUTES_PER_DAY {
            let text = minutes_to_time(minutes);
            assert_eq!(time_to_minutes(&text), Ok(minutes));
            assert_eq!(minutes_to_time(time_to_minutes(&text).unwrap()), text);
        }
    }

    #[test]
    fn applies_offset_and_wraps() {
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 20, 15, 0).unwrap();
        assert_eq!(date_to_minutes(at, 0), 20 * 60 + 15);
        assert_eq!(date_to_minutes(at, 7), 3 * 60 + 15);
        assert_eq!(date_to_minutes(at, -21), 23 * 60 + 15);
    }

    #[test]
    fn four_hour_window_is_inclusive_and_symmetric() {
        let base = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        assert!(is_less_than_four_hours(base, base + Duration::hours(4)));
        assert!(is_less_than_four_hours(base + Duration::hours(4), base));
        assert!(!is_less_than_four_hours(base, base + Duration::hours(4) + Duration::minutes(1)));
    }

    #[test]
    fn local_conversions_agree() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let instant = local_to_utc(date, 8 * 60, 7);
        assert_eq!(instant, Utc.with_ymd_and_hms(2025, 3, 10, 1, 0, 0).unwrap());
        assert_eq!(date_to_minutes(instant, 7), 8 * 60);
        assert_eq!(local_date(instant, 7), date);

        let late = Utc.with_ymd_and_hms(2025, 3, 10, 20, 0, 0).unwrap();
        assert_eq!(local_date(late, 7), NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());
    }

    #[test]
    fn truncates_seconds() {
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 42).unwrap() + Duration::milliseconds(250);
        assert_eq!(truncate_to_minute(at), Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap());
    }
}
