//! Missed-day detection over a trailing window.

use chrono::NaiveDate;

use crate::calendar::{add_days, days_between};
use crate::model::LogSet;

/// Default trailing window the app inspects for catch-up suggestions.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// Computes up to `shortfall` uncompleted plan dates, nearest-first.
///
/// Obligations accrue at the weekly cadence, never daily: with `elapsed`
/// days between the effective start (the later of window start and plan
/// start) and `today`, `expected = ceil(elapsed * weekly_target / 7)`. A user
/// who reads three times a week by design is therefore never flagged for the
/// other four days.
///
/// The walk starts at yesterday, so future dates (and today itself, which is
/// still actionable) are never returned, and it stops at the effective start,
/// so nothing before the plan began is flagged. Callers wanting chronological
/// order must sort.
#[must_use]
pub fn missed_days(
    logs: &LogSet,
    lookback_days: u32,
    weekly_target: u8,
    plan_start: Option<NaiveDate>,
    today: NaiveDate,
) -> Vec<NaiveDate> {
    let window_start = add_days(today, -i64::from(lookback_days));
    let effective_start = match plan_start {
        Some(start) if start > window_start => start,
        _ => window_start,
    };

    let elapsed = days_between(effective_start, today);
    if elapsed <= 0 {
        // Fresh plan (or one starting in the future): no obligations yet.
        return Vec::new();
    }

    let target = i64::from(weekly_target.clamp(1, 7));
    let expected = (elapsed * target + 6) / 7;

    let completed = logs
        .completed_logs()
        .filter(|log| log.date >= effective_start && log.date <= today)
        .count();
    let completed = i64::try_from(completed).unwrap_or(i64::MAX);

    let shortfall = (expected - completed).max(0);
    if shortfall == 0 {
        return Vec::new();
    }

    let mut missed = Vec::new();
    let mut cursor = add_days(today, -1);
    while cursor >= effective_start && (missed.len() as i64) < shortfall {
        if !logs.is_completed(cursor) {
            missed.push(cursor);
        }
        cursor = add_days(cursor, -1);
    }
    missed
}
