//! Small shared helpers

pub mod cron_helper;
pub mod time;

pub use time::{TimeWindow, date_range, format_date, parse_date, today_in};
