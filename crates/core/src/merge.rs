//! Merge of the local and remote log sets into one canonical set.
//!
//! Runs on every cold hydrate. There is exactly one writer (the owning user,
//! possibly from several devices sequentially), so last-write-wins on the
//! effective timestamp is enough — with the single override that a finished
//! entry must never be masked by an unfinished one.

use chrono::NaiveDate;

use crate::model::{DayReadingLog, LogSet, ReadingMode};

/// Outcome of merging the local and remote sets.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    /// Canonical set, keyed by plan date.
    pub canonical: LogSet,
    /// Dates whose canonical entry the remote side lacks (or holds a losing
    /// version of). These are the only entries pushed remotely — never a bulk
    /// overwrite of rows already confirmed remote.
    pub push_to_remote: Vec<NaiveDate>,
    /// True when the local store differs from the canonical set and must be
    /// rewritten.
    pub local_stale: bool,
}

/// Merges per date key: single-sided entries are kept; both-sided conflicts
/// go through [`pick`].
#[must_use]
pub fn merge_logs(local: &LogSet, remote: &LogSet) -> MergeResult {
    let mut canonical = LogSet::new();

    for log in local.iter() {
        let winner = match remote.get(log.date) {
            Some(other) => pick(log, other).clone(),
            None => log.clone(),
        };
        canonical.insert(winner);
    }
    for log in remote.iter() {
        if local.get(log.date).is_none() {
            canonical.insert(log.clone());
        }
    }

    let push_to_remote = canonical
        .iter()
        .filter(|log| remote.get(log.date) != Some(log))
        .map(|log| log.date)
        .collect();
    let local_stale = canonical.iter().any(|log| local.get(log.date) != Some(log));

    MergeResult {
        canonical,
        push_to_remote,
        local_stale,
    }
}

/// Conflict rule for two entries sharing a date.
///
/// `completed = true` always beats `completed = false`, regardless of
/// timestamps; otherwise the later effective timestamp wins. The remaining
/// comparisons are a deterministic tie-break so the merge is commutative on
/// content even for pathological equal-timestamp conflicts.
fn pick<'a>(a: &'a DayReadingLog, b: &'a DayReadingLog) -> &'a DayReadingLog {
    fn key(log: &DayReadingLog) -> impl Ord + '_ {
        (
            log.completed,
            log.effective_timestamp(),
            log.points_earned,
            matches!(log.mode, ReadingMode::Scheduled),
            &log.section_ids,
        )
    }
    if key(b) > key(a) { b } else { a }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::add_days;
    use crate::time::{fixed_now, fixed_today};
    use chrono::Duration;

    fn entry(offset: i64, completed: bool, at_offset_secs: i64) -> DayReadingLog {
        DayReadingLog {
            date: add_days(fixed_today(), offset),
            mode: ReadingMode::Scheduled,
            completed,
            points_earned: if completed { 10 } else { 0 },
            completed_at: Some(fixed_now() + Duration::seconds(at_offset_secs)),
            section_ids: Vec::new(),
        }
    }

    #[test]
    fn single_sided_entries_are_kept() {
        let local = LogSet::from_logs(vec![entry(-1, true, 0)]);
        let remote = LogSet::from_logs(vec![entry(-2, true, 0)]);

        let result = merge_logs(&local, &remote);
        assert_eq!(result.canonical.len(), 2);
        // The local-only entry must be pushed; the remote-only one must not.
        assert_eq!(result.push_to_remote, vec![add_days(fixed_today(), -1)]);
        // Local lacks the remote-only entry.
        assert!(result.local_stale);
    }

    #[test]
    fn later_effective_timestamp_wins() {
        let older = entry(0, true, 0);
        let mut newer = entry(0, true, 3600);
        newer.points_earned = 30;

        let result = merge_logs(
            &LogSet::from_logs(vec![older.clone()]),
            &LogSet::from_logs(vec![newer.clone()]),
        );
        assert_eq!(result.canonical.get(fixed_today()), Some(&newer));
        // Remote already holds the winner: nothing to push.
        assert!(result.push_to_remote.is_empty());
        assert!(result.local_stale);
    }

    #[test]
    fn completed_beats_uncompleted_regardless_of_timestamps() {
        let done = entry(0, true, 0);
        let unfinished = entry(0, false, 7200);

        let forward = merge_logs(
            &LogSet::from_logs(vec![done.clone()]),
            &LogSet::from_logs(vec![unfinished.clone()]),
        );
        assert_eq!(forward.canonical.get(fixed_today()), Some(&done));

        let reverse = merge_logs(
            &LogSet::from_logs(vec![unfinished]),
            &LogSet::from_logs(vec![done.clone()]),
        );
        assert_eq!(reverse.canonical.get(fixed_today()), Some(&done));
    }

    #[test]
    fn merge_is_commutative_on_content() {
        let local = LogSet::from_logs(vec![
            entry(-3, true, 0),
            entry(-1, false, 500),
            entry(0, true, 100),
        ]);
        let remote = LogSet::from_logs(vec![
            entry(-2, true, 0),
            entry(-1, true, 10),
            entry(0, true, 100),
        ]);

        let forward = merge_logs(&local, &remote);
        let reverse = merge_logs(&remote, &local);
        assert_eq!(forward.canonical, reverse.canonical);
    }

    #[test]
    fn missing_timestamp_falls_back_to_plan_date_midnight() {
        let mut stale = entry(-1, true, 0);
        stale.completed_at = None;
        let fresh = entry(-1, true, 60);

        let result = merge_logs(
            &LogSet::from_logs(vec![stale]),
            &LogSet::from_logs(vec![fresh.clone()]),
        );
        assert_eq!(result.canonical.get(add_days(fixed_today(), -1)), Some(&fresh));
    }

    #[test]
    fn identical_sides_need_no_repair() {
        let set = LogSet::from_logs(vec![entry(-1, true, 0), entry(0, true, 0)]);
        let result = merge_logs(&set, &set.clone());
        assert!(result.push_to_remote.is_empty());
        assert!(!result.local_stale);
        assert_eq!(result.canonical, set);
    }
}
