//! Cron helpers shared by config validation and the scheduler
//!
//! Expressions use the `cron` crate's seconds-first syntax
//! (`sec min hour day-of-month month day-of-week [year]`).

use chrono::{DateTime, TimeZone, Utc};
use cron::Schedule;
use std::str::FromStr;

pub fn parse_schedule(cron_expression: &str) -> Result<Schedule, String> {
    Schedule::from_str(cron_expression.trim())
        .map_err(|e| format!("Invalid cron expression '{cron_expression}': {e}"))
}

pub fn validate_cron_expression(cron_expression: &str) -> Result<(), String> {
    parse_schedule(cron_expression).map(|_| ())
}

/// Next fire time strictly after `after`, evaluated in the schedule's zone
pub fn next_fire_after<Z: TimeZone>(
    schedule: &Schedule,
    after: &DateTime<Z>,
) -> Option<DateTime<Utc>> {
    schedule.after(after).next().map(|t| t.with_timezone(&Utc))
}

/// Next fire time from now in `tz`
pub fn next_fire<Z: TimeZone>(schedule: &Schedule, tz: &Z) -> Option<DateTime<Utc>> {
    next_fire_after(schedule, &Utc::now().with_timezone(tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Shanghai;

    #[test]
    fn default_jobs_fire_at_local_times() {
        let midnight = parse_schedule("0 1 0 * * *").unwrap();
        let after = Shanghai.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let next = next_fire_after(&midnight, &after).unwrap();
        // 00:01 on 2 May in Shanghai is 16:01 UTC on 1 May
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 1, 16, 1, 0).unwrap());

        let cleanup = parse_schedule("0 0 4 * * *").unwrap();
        let next = next_fire_after(&cleanup, &after).unwrap();
        assert_eq!(next.with_timezone(&Shanghai).format("%H:%M").to_string(), "04:00");
    }

    #[test]
    fn invalid_expression_is_reported() {
        let err = validate_cron_expression("invalid").unwrap_err();
        assert!(err.contains("Invalid cron expression"));
    }

    #[test]
    fn next_fire_is_in_the_future() {
        let schedule = parse_schedule("0 0 */12 * * *").unwrap();
        assert!(next_fire(&schedule, &Shanghai).unwrap() > Utc::now());
    }
}
