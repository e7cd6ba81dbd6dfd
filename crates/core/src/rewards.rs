//! Points awarded for a single completion event.
//!
//! The whole module is side-effect-free: the session controller calls it to
//! commit points, and the UI calls the same function to render a "what you'll
//! earn" preview before the user commits.

use chrono::{DateTime, NaiveDate, Utc};

use crate::calendar::{date_of, is_same_week};
use crate::model::{DayReadingLog, LogSet, ReadingMode};
use crate::streak::{is_milestone, run_ending_at};

/// Base points for completing the scheduled day.
pub const SCHEDULED_BASE_POINTS: u32 = 10;
/// Base points for a makeup reading (deliberately lower).
pub const MAKEUP_BASE_POINTS: u32 = 5;
/// One-time bonus for crossing the weekly target.
pub const WEEKLY_BONUS_POINTS: u32 = 20;
/// One-time bonus for reaching a streak milestone.
pub const STREAK_BONUS_POINTS: u32 = 50;

/// Itemized result of the reward calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardBreakdown {
    pub base: u32,
    pub weekly_bonus: u32,
    pub streak_bonus: u32,
}

impl RewardBreakdown {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.base + self.weekly_bonus + self.streak_bonus
    }
}

/// Base points for a mode.
#[must_use]
pub fn base_points(mode: ReadingMode) -> u32 {
    match mode {
        ReadingMode::Scheduled => SCHEDULED_BASE_POINTS,
        ReadingMode::Makeup => MAKEUP_BASE_POINTS,
    }
}

/// Computes the points a completion of `date` in `mode` would earn.
///
/// `logs` is the canonical set *excluding* the entry being computed;
/// `completed_at` is the instant the completion is (or would be) performed,
/// which drives the streak's effective date. The weekly target is clamped to
/// `[1, 7]`.
///
/// The weekly bonus is awarded exactly once per calendar week: on whichever
/// completion crosses the target, and never if an earlier entry in the week
/// already carries it.
#[must_use]
pub fn calculate_reward(
    logs: &LogSet,
    date: NaiveDate,
    mode: ReadingMode,
    weekly_target: u8,
    completed_at: DateTime<Utc>,
) -> RewardBreakdown {
    let target = u32::from(weekly_target.clamp(1, 7));
    let base = base_points(mode);

    // Completions already in the candidate's calendar week, candidate excluded.
    let week_logs: Vec<&DayReadingLog> = logs
        .completed_logs()
        .filter(|log| log.date != date && is_same_week(log.date, date))
        .collect();
    let week_count = u32::try_from(week_logs.len()).unwrap_or(u32::MAX);

    let week_already_bonused = week_logs.iter().any(|log| carries_weekly_bonus(log));
    let weekly_bonus = if week_count < target && week_count + 1 >= target && !week_already_bonused {
        WEEKLY_BONUS_POINTS
    } else {
        0
    };

    // Prospective streak: the run that would end at the candidate's effective
    // date once it is added. Bonus only when the milestone is newly reached,
    // which requires the effective date to be new: a second completion on an
    // already-counted day leaves the streak (and any bonus it earned) as is.
    let effective = date_of(completed_at);
    let dates = logs.effective_dates();
    let (before, after) = if dates.binary_search(&effective).is_ok() {
        let run = run_ending_at(&dates, effective);
        (run, run)
    } else {
        let run = run_ending_at(&dates, crate::calendar::add_days(effective, -1)) + 1;
        (run - 1, run)
    };
    let streak_bonus = if is_milestone(after) && !is_milestone(before) {
        STREAK_BONUS_POINTS
    } else {
        0
    };

    RewardBreakdown {
        base,
        weekly_bonus,
        streak_bonus,
    }
}

/// Whether an already-persisted entry includes the weekly bonus.
///
/// `points_earned` is the only durable record, so the bonus is decoded from
/// the remainder over the mode's base. The constants are chosen so the four
/// possible remainders (0, weekly, streak, weekly+streak) are distinct.
#[must_use]
pub fn carries_weekly_bonus(log: &DayReadingLog) -> bool {
    let rem = log.points_earned.saturating_sub(base_points(log.mode));
    rem == WEEKLY_BONUS_POINTS || rem == WEEKLY_BONUS_POINTS + STREAK_BONUS_POINTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::add_days;
    use crate::time::{fixed_now, fixed_today};

    fn scheduled(date: NaiveDate, points: u32) -> DayReadingLog {
        let at = date.and_hms_opt(12, 0, 0).unwrap().and_utc();
        DayReadingLog::completed(date, ReadingMode::Scheduled, points, at, Vec::new())
    }

    #[test]
    fn fresh_plan_earns_base_only() {
        // Weekly target 7, no prior logs: 1/7 done, no bonus possible.
        let reward = calculate_reward(
            &LogSet::new(),
            fixed_today(),
            ReadingMode::Scheduled,
            7,
            fixed_now(),
        );
        assert_eq!(reward.base, SCHEDULED_BASE_POINTS);
        assert_eq!(reward.weekly_bonus, 0);
        assert_eq!(reward.streak_bonus, 0);
        assert_eq!(reward.total(), SCHEDULED_BASE_POINTS);
    }

    #[test]
    fn crossing_weekly_target_awards_bonus() {
        // fixed_today() is a Monday; use a mid-week day so the two prior
        // completions land in the same week.
        let wednesday = add_days(fixed_today(), 2);
        let logs = LogSet::from_logs(vec![
            scheduled(fixed_today(), SCHEDULED_BASE_POINTS),
            scheduled(add_days(fixed_today(), 1), SCHEDULED_BASE_POINTS),
        ]);

        let at = wednesday.and_hms_opt(20, 0, 0).unwrap().and_utc();
        let reward = calculate_reward(&logs, wednesday, ReadingMode::Scheduled, 3, at);
        assert_eq!(reward.weekly_bonus, WEEKLY_BONUS_POINTS);
        assert_eq!(reward.total(), SCHEDULED_BASE_POINTS + WEEKLY_BONUS_POINTS);
    }

    #[test]
    fn weekly_bonus_not_repeated_after_target() {
        // Three completions already this week, one of which carries the bonus.
        let logs = LogSet::from_logs(vec![
            scheduled(fixed_today(), SCHEDULED_BASE_POINTS),
            scheduled(add_days(fixed_today(), 1), SCHEDULED_BASE_POINTS),
            scheduled(
                add_days(fixed_today(), 2),
                SCHEDULED_BASE_POINTS + WEEKLY_BONUS_POINTS,
            ),
        ]);

        let thursday = add_days(fixed_today(), 3);
        let at = thursday.and_hms_opt(8, 0, 0).unwrap().and_utc();
        let reward = calculate_reward(&logs, thursday, ReadingMode::Scheduled, 3, at);
        assert_eq!(reward.weekly_bonus, 0);
    }

    #[test]
    fn weekly_bonus_awarded_once_in_any_order() {
        // Complete Mon/Tue/Wed of one week in every order; exactly one of the
        // three completions must carry the bonus each time.
        let days: Vec<NaiveDate> = (0..3).map(|o| add_days(fixed_today(), o)).collect();
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        for order in orders {
            let mut logs = LogSet::new();
            let mut bonuses = 0;
            for &idx in &order {
                let date = days[idx];
                let at = date.and_hms_opt(9, 0, 0).unwrap().and_utc();
                let reward = calculate_reward(&logs, date, ReadingMode::Scheduled, 3, at);
                if reward.weekly_bonus > 0 {
                    bonuses += 1;
                }
                logs.insert(DayReadingLog::completed(
                    date,
                    ReadingMode::Scheduled,
                    reward.total(),
                    at,
                    Vec::new(),
                ));
            }
            assert_eq!(bonuses, 1, "order {order:?} awarded {bonuses} bonuses");
        }
    }

    #[test]
    fn streak_milestone_awards_bonus_once() {
        // Six consecutive effective days; the seventh crosses the milestone.
        let logs = LogSet::from_logs(
            (1..=6).map(|o| scheduled(add_days(fixed_today(), -o), SCHEDULED_BASE_POINTS)),
        );

        let reward = calculate_reward(&logs, fixed_today(), ReadingMode::Scheduled, 7, fixed_now());
        assert_eq!(reward.streak_bonus, STREAK_BONUS_POINTS);

        // An eighth consecutive day is not a milestone.
        let extended = LogSet::from_logs(
            (0..=6).map(|o| scheduled(add_days(fixed_today(), -o), SCHEDULED_BASE_POINTS)),
        );
        let next = add_days(fixed_today(), 1);
        let at = next.and_hms_opt(9, 0, 0).unwrap().and_utc();
        let reward = calculate_reward(&extended, next, ReadingMode::Scheduled, 7, at);
        assert_eq!(reward.streak_bonus, 0);
    }

    #[test]
    fn makeup_counts_toward_todays_streak() {
        // Six-day run ending yesterday; a makeup for a gap day performed today
        // extends today's streak to seven and earns the milestone bonus.
        let logs = LogSet::from_logs(
            (1..=6).map(|o| scheduled(add_days(fixed_today(), -o), SCHEDULED_BASE_POINTS)),
        );
        let missed = add_days(fixed_today(), -10);

        let reward = calculate_reward(&logs, missed, ReadingMode::Makeup, 7, fixed_now());
        assert_eq!(reward.base, MAKEUP_BASE_POINTS);
        assert_eq!(reward.streak_bonus, STREAK_BONUS_POINTS);
    }

    #[test]
    fn second_completion_on_same_day_does_not_repeat_milestone_bonus() {
        // Seven-day run ending today; today's scheduled entry already carries
        // the milestone bonus. A makeup performed later the same day shares
        // today's effective date, so the streak is unchanged and the bonus
        // must not be paid again.
        let mut logs = LogSet::from_logs(
            (1..=6).map(|o| scheduled(add_days(fixed_today(), -o), SCHEDULED_BASE_POINTS)),
        );
        logs.insert(scheduled(
            fixed_today(),
            SCHEDULED_BASE_POINTS + STREAK_BONUS_POINTS,
        ));

        let missed = add_days(fixed_today(), -10);
        let reward = calculate_reward(&logs, missed, ReadingMode::Makeup, 7, fixed_now());
        assert_eq!(reward.streak_bonus, 0);
        assert_eq!(reward.total(), MAKEUP_BASE_POINTS);
    }

    #[test]
    fn preview_is_side_effect_free() {
        let logs = LogSet::from_logs(vec![scheduled(fixed_today(), SCHEDULED_BASE_POINTS)]);
        let before = logs.clone();
        let _ = calculate_reward(&logs, add_days(fixed_today(), 1), ReadingMode::Scheduled, 3, fixed_now());
        assert_eq!(logs, before);
    }

    #[test]
    fn bonus_decoding_distinguishes_all_combinations() {
        let base = scheduled(fixed_today(), SCHEDULED_BASE_POINTS);
        assert!(!carries_weekly_bonus(&base));

        let weekly = scheduled(fixed_today(), SCHEDULED_BASE_POINTS + WEEKLY_BONUS_POINTS);
        assert!(carries_weekly_bonus(&weekly));

        let streak = scheduled(fixed_today(), SCHEDULED_BASE_POINTS + STREAK_BONUS_POINTS);
        assert!(!carries_weekly_bonus(&streak));

        let both = scheduled(
            fixed_today(),
            SCHEDULED_BASE_POINTS + WEEKLY_BONUS_POINTS + STREAK_BONUS_POINTS,
        );
        assert!(carries_weekly_bonus(&both));
    }
}
