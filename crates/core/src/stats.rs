//! Derivation of display stats from the canonical log set.

use chrono::NaiveDate;

use crate::calendar::{days_between, is_same_month, is_same_week};
use crate::model::{LogSet, UserStats};
use crate::streak::streak_of;

/// Recomputes `UserStats` from scratch.
///
/// This is the only place the "is the streak still alive" check happens: the
/// raw streak walk reports the run ending at the latest effective date, and
/// here it is zeroed out if that date is more than one day before `today`.
/// `longest` stays historically accurate either way.
///
/// Weekly and monthly points bucket by effective (performance) date, matching
/// the streak policy: points earned this week belong to this week even when
/// they paid off an older plan day.
#[must_use]
pub fn compute_stats(logs: &LogSet, today: NaiveDate) -> UserStats {
    let mut total_points = 0_u32;
    let mut weekly_points = 0_u32;
    let mut monthly_points = 0_u32;
    let mut total_readings = 0_u32;
    let mut last_completed_date: Option<NaiveDate> = None;

    for log in logs.completed_logs() {
        total_points = total_points.saturating_add(log.points_earned);
        total_readings = total_readings.saturating_add(1);

        let effective = log.effective_date();
        if is_same_week(effective, today) {
            weekly_points = weekly_points.saturating_add(log.points_earned);
        }
        if is_same_month(effective, today) {
            monthly_points = monthly_points.saturating_add(log.points_earned);
        }

        if last_completed_date.is_none_or(|d| log.date > d) {
            last_completed_date = Some(log.date);
        }
    }

    let streak = streak_of(logs);
    let latest_effective = logs.effective_dates().last().copied();
    let current_streak_days = match latest_effective {
        Some(latest) if days_between(latest, today) <= 1 => streak.current,
        _ => 0,
    };

    UserStats {
        total_points,
        current_streak_days,
        longest_streak_days: streak.longest,
        total_readings,
        weekly_points,
        monthly_points,
        last_completed_date,
    }
}
