//! Consecutive-day streak derivation.

use chrono::NaiveDate;

use crate::calendar::days_between;
use crate::model::LogSet;

/// Streaks follow the day a reading was *performed* (`completed_at`), not the
/// plan day it satisfied. A makeup done today for last week extends today's
/// streak: streaks measure practice consistency, not plan adherence.
pub const STREAK_USES_PERFORMANCE_DATE: bool = true;

/// Streak lengths that are exact multiples of this are milestones.
pub const MILESTONE_INTERVAL: u32 = 7;

/// Current and longest consecutive-day runs over a set of completion dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakSummary {
    /// Length of the run ending at the latest date in the set.
    pub current: u32,
    /// Longest run seen anywhere in the set.
    pub longest: u32,
}

/// Returns true if a streak of length `n` sits on a milestone.
#[must_use]
pub fn is_milestone(n: u32) -> bool {
    n > 0 && n % MILESTONE_INTERVAL == 0
}

/// Walks sorted, deduplicated dates and derives the streak summary.
///
/// The walk has no notion of "now": `current` is simply the run ending at the
/// latest date. Whether that run is still alive today is decided by the stats
/// layer, which knows the clock.
#[must_use]
pub fn streak_summary(dates: &[NaiveDate]) -> StreakSummary {
    let mut current = 0_u32;
    let mut longest = 0_u32;
    let mut prev: Option<NaiveDate> = None;

    for &date in dates {
        current = match prev {
            Some(p) if days_between(p, date) == 1 => current + 1,
            Some(p) if days_between(p, date) == 0 => current,
            _ => 1,
        };
        longest = longest.max(current);
        prev = Some(date);
    }

    StreakSummary { current, longest }
}

/// Streak summary over the effective dates of a log set's completions.
#[must_use]
pub fn streak_of(logs: &LogSet) -> StreakSummary {
    streak_summary(&logs.effective_dates())
}

/// Length of the consecutive run ending exactly at `end`.
///
/// Zero if `end` itself is not in the set. Used for prospective milestone
/// checks in the reward calculator.
#[must_use]
pub fn run_ending_at(dates: &[NaiveDate], end: NaiveDate) -> u32 {
    let mut run = 0_u32;
    let mut cursor = end;
    while dates.binary_search(&cursor).is_ok() {
        run += 1;
        cursor = crate::calendar::add_days(cursor, -1);
    }
    run
}
