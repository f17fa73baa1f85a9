//! Normalization of upstream start/end values into a provider's local day
//!
//! Upstreams hand back local date-time strings or Unix timestamps, and their
//! listings routinely spill into the neighbouring days. Everything is parsed
//! into the provider's zone and clamped to `[00:00:00, 23:59:59]` of the
//! requested date.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Layout used by most upstreams for local date-times
pub const LOCAL_DATETIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Values above this are milliseconds rather than seconds
const MILLIS_THRESHOLD: i64 = 9_999_999_999;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeRangeError {
    #[error("invalid start time '{0}'")]
    InvalidStart(String),
    #[error("invalid end time '{0}'")]
    InvalidEnd(String),
    #[error("timestamp out of range: {0}")]
    InvalidTimestamp(i64),
    #[error("local time {0} does not exist in zone")]
    NonexistentLocalTime(NaiveDateTime),
    #[error("empty range after clamping: {start} .. {end}")]
    Empty { start: String, end: String },
}

/// Unix timestamp in seconds, or milliseconds when past the 10-digit range
pub fn parse_timestamp(ts: i64) -> Option<DateTime<Utc>> {
    if ts > MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(ts)
    } else {
        DateTime::from_timestamp(ts, 0)
    }
}

/// Parse local strings in `layout`, then clamp into `date`
pub fn process_time_range(
    start: &str,
    end: &str,
    date: NaiveDate,
    layout: &str,
    tz: Tz,
) -> Result<(DateTime<Tz>, DateTime<Tz>), TimeRangeError> {
    let start_naive = NaiveDateTime::parse_from_str(start.trim(), layout)
        .map_err(|_| TimeRangeError::InvalidStart(start.to_string()))?;
    let end_naive = NaiveDateTime::parse_from_str(end.trim(), layout)
        .map_err(|_| TimeRangeError::InvalidEnd(end.to_string()))?;

    clamp_to_day(localize(start_naive, tz)?, localize(end_naive, tz)?, date, tz)
}

/// Same as [`process_time_range`] for Unix timestamps
pub fn process_time_range_from_timestamps(
    start: i64,
    end: i64,
    date: NaiveDate,
    tz: Tz,
) -> Result<(DateTime<Tz>, DateTime<Tz>), TimeRangeError> {
    let start = parse_timestamp(start).ok_or(TimeRangeError::InvalidTimestamp(start))?;
    let end = parse_timestamp(end).ok_or(TimeRangeError::InvalidTimestamp(end))?;
    clamp_to_day(start.with_timezone(&tz), end.with_timezone(&tz), date, tz)
}

/// Clamp both endpoints into `date` in `tz`; a range that collapses is rejected
pub fn clamp_to_day(
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    date: NaiveDate,
    tz: Tz,
) -> Result<(DateTime<Tz>, DateTime<Tz>), TimeRangeError> {
    let day_start = localize(date.and_time(NaiveTime::MIN), tz)?;
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    let day_end = localize(date.and_time(last_second), tz)?;

    let start = start.max(day_start);
    let end = end.min(day_end);
    if end <= start {
        return Err(TimeRangeError::Empty {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        });
    }
    Ok((start, end))
}

fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>, TimeRangeError> {
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or(TimeRangeError::NonexistentLocalTime(naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Shanghai;
    use rstest::rstest;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn hms(dt: DateTime<Tz>) -> String {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    #[test]
    fn spill_into_next_day_is_clamped_to_last_second() {
        let (start, end) = process_time_range(
            "2024-05-01 23:00:00",
            "2024-05-02 02:00:00",
            d("2024-05-01"),
            LOCAL_DATETIME_LAYOUT,
            Shanghai,
        )
        .unwrap();
        assert_eq!(hms(start), "2024-05-01 23:00:00");
        assert_eq!(hms(end), "2024-05-01 23:59:59");
    }

    #[test]
    fn spill_from_previous_day_starts_at_midnight() {
        let (start, end) = process_time_range(
            "2024-04-30 23:30:00",
            "2024-05-01 00:30:00",
            d("2024-05-01"),
            LOCAL_DATETIME_LAYOUT,
            Shanghai,
        )
        .unwrap();
        assert_eq!(hms(start), "2024-05-01 00:00:00");
        assert_eq!(hms(end), "2024-05-01 00:30:00");
    }

    #[test]
    fn program_entirely_outside_the_day_is_rejected() {
        let err = process_time_range(
            "2024-05-02 01:00:00",
            "2024-05-02 02:00:00",
            d("2024-05-01"),
            LOCAL_DATETIME_LAYOUT,
            Shanghai,
        )
        .unwrap_err();
        assert!(matches!(err, TimeRangeError::Empty { .. }));
    }

    #[test]
    fn malformed_strings_name_the_bad_side() {
        let err = process_time_range(
            "nope",
            "2024-05-01 02:00:00",
            d("2024-05-01"),
            LOCAL_DATETIME_LAYOUT,
            Shanghai,
        )
        .unwrap_err();
        assert_eq!(err, TimeRangeError::InvalidStart("nope".into()));
    }

    #[rstest]
    #[case::seconds(1_714_521_600)]
    #[case::millis(1_714_521_600_000)]
    fn timestamps_in_either_unit(#[case] ts: i64) {
        let parsed = parse_timestamp(ts).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn timestamps_are_localized_before_clamping() {
        // 2024-05-01 08:00 and 09:00 in Shanghai
        let (start, end) = process_time_range_from_timestamps(
            1_714_521_600,
            1_714_525_200,
            d("2024-05-01"),
            Shanghai,
        )
        .unwrap();
        assert_eq!(hms(start), "2024-05-01 08:00:00");
        assert_eq!(hms(end), "2024-05-01 09:00:00");
    }
}
