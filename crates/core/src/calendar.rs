//! Pure calendar arithmetic for the reading plan.
//!
//! Everything here operates on `NaiveDate` (calendar dates), never on
//! instants. Logs carry UTC timestamps, but the moment a computation cares
//! about "which day", the timestamp is projected onto its UTC calendar date
//! via [`date_of`] and stays there. `days_between` is therefore a plain
//! date-ordinal subtraction and can never shift across a DST transition.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use thiserror::Error;

/// Date format used for persistence and merge keys (ISO `YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("invalid date string: {0}")]
    InvalidDate(String),
}

/// Parses an ISO `YYYY-MM-DD` date string.
///
/// # Errors
///
/// Returns `CalendarError::InvalidDate` if the string is not a valid date.
pub fn parse_date(s: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| CalendarError::InvalidDate(s.to_owned()))
}

/// Formats a date as ISO `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Returns the weekday of the given date.
#[must_use]
pub fn weekday_of(date: NaiveDate) -> Weekday {
    date.weekday()
}

/// Returns the Monday that starts the week containing `date`.
#[must_use]
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Returns true if both dates fall in the same Monday-anchored week.
#[must_use]
pub fn is_same_week(a: NaiveDate, b: NaiveDate) -> bool {
    start_of_week(a) == start_of_week(b)
}

/// Returns true if both dates fall in the same calendar month.
#[must_use]
pub fn is_same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Signed day difference `b - a` (positive when `b` is after `a`).
#[must_use]
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days()
}

/// Returns `date` shifted by `days` (negative values go backwards).
#[must_use]
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// Projects a UTC timestamp onto its UTC calendar date.
///
/// This is the "effective date" projection used by streaks: a completion
/// performed at any instant belongs to the UTC day it happened on.
#[must_use]
pub fn date_of(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}
