//! Business-day arithmetic on the UTC calendar.
//!
//! Monday through Friday are business days. No holiday calendar is applied.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};

/// Maximum number of touched business days for a response to count as within 48 business hours.
pub const SLA_BUSINESS_DAYS: i64 = 2;

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Counts the business days among the calendar dates from `start` to `end`, both inclusive.
///
/// This is a count of days touched, not elapsed time: two instants on the same business
/// day yield 1. Returns 0 when `start` is after `end`.
pub fn business_days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    if start > end {
        return 0;
    }

    start
        .date_naive()
        .iter_days()
        .take_while(|day| *day <= end.date_naive())
        .filter(|day| is_business_day(*day))
        .count() as i64
}
