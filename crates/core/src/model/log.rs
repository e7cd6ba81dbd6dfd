use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::calendar::{date_of, weekday_of};
use crate::model::ids::SectionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur when decoding a reading mode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModeError {
    #[error("invalid reading mode: {0}")]
    Invalid(String),
}

//
// ─── READING MODE ─────────────────────────────────────────────────────────────
//

/// Whether a completion satisfied the day it names or a previously missed day.
///
/// - `Scheduled`: read on (or for) the plan day itself.
/// - `Makeup`: a catch-up reading performed later for a day that was missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingMode {
    Scheduled,
    Makeup,
}

impl ReadingMode {
    /// Stable string form used by storage and the remote wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReadingMode::Scheduled => "scheduled",
            ReadingMode::Makeup => "makeup",
        }
    }

    /// Parses the stable string form.
    ///
    /// # Errors
    ///
    /// Returns `ModeError::Invalid` for unknown values.
    pub fn parse(s: &str) -> Result<Self, ModeError> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "makeup" => Ok(Self::Makeup),
            other => Err(ModeError::Invalid(other.to_owned())),
        }
    }
}

//
// ─── DAY READING LOG ──────────────────────────────────────────────────────────
//

/// One entry per calendar date of the plan; the date is the identity key.
///
/// `points_earned` is computed once at completion time and never recomputed
/// retroactively. `completed_at` is the wall-clock instant of the write and
/// may differ from `date` (a makeup done days later).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayReadingLog {
    pub date: NaiveDate,
    pub mode: ReadingMode,
    pub completed: bool,
    pub points_earned: u32,
    pub completed_at: Option<DateTime<Utc>>,
    pub section_ids: Vec<SectionId>,
}

impl DayReadingLog {
    /// Builds a completed entry for `date`.
    #[must_use]
    pub fn completed(
        date: NaiveDate,
        mode: ReadingMode,
        points_earned: u32,
        completed_at: DateTime<Utc>,
        section_ids: Vec<SectionId>,
    ) -> Self {
        Self {
            date,
            mode,
            completed: true,
            points_earned,
            completed_at: Some(completed_at),
            section_ids,
        }
    }

    /// Weekday of the plan date. Derived and redundant, kept for display.
    #[must_use]
    pub fn weekday(&self) -> Weekday {
        weekday_of(self.date)
    }

    /// Calendar date the reading was actually performed on.
    ///
    /// Prefers `completed_at`'s UTC day over the plan date, so a makeup
    /// counts toward the day it was done, not the day it satisfied.
    #[must_use]
    pub fn effective_date(&self) -> NaiveDate {
        self.completed_at.map_or(self.date, date_of)
    }

    /// Timestamp used for merge conflict resolution.
    ///
    /// `completed_at` when present, otherwise midnight UTC of the plan date.
    #[must_use]
    pub fn effective_timestamp(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or_else(|| {
            self.date
                .and_hms_opt(0, 0, 0)
                .unwrap_or_default()
                .and_utc()
        })
    }
}

//
// ─── LOG SET ──────────────────────────────────────────────────────────────────
//

/// Canonical set of reading logs, keyed by plan date.
///
/// Upholds the at-most-one-entry-per-date invariant by construction: inserting
/// an entry for an existing date replaces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSet {
    entries: BTreeMap<NaiveDate, DayReadingLog>,
}

impl LogSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from a list of logs; later entries for the same date win.
    #[must_use]
    pub fn from_logs(logs: impl IntoIterator<Item = DayReadingLog>) -> Self {
        let mut set = Self::new();
        for log in logs {
            set.insert(log);
        }
        set
    }

    /// Inserts or replaces the entry for the log's date.
    pub fn insert(&mut self, log: DayReadingLog) {
        self.entries.insert(log.date, log);
    }

    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&DayReadingLog> {
        self.entries.get(&date)
    }

    /// Returns true if the date has a `completed = true` entry.
    #[must_use]
    pub fn is_completed(&self, date: NaiveDate) -> bool {
        self.entries.get(&date).is_some_and(|log| log.completed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in ascending date order.
    pub fn iter(&self) -> impl Iterator<Item = &DayReadingLog> {
        self.entries.values()
    }

    /// Completed entries in ascending date order.
    pub fn completed_logs(&self) -> impl Iterator<Item = &DayReadingLog> {
        self.entries.values().filter(|log| log.completed)
    }

    /// Distinct effective (performance) dates of completed entries, ascending.
    #[must_use]
    pub fn effective_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .completed_logs()
            .map(DayReadingLog::effective_date)
            .collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    /// Consumes the set, yielding entries in ascending date order.
    #[must_use]
    pub fn into_logs(self) -> Vec<DayReadingLog> {
        self.entries.into_values().collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
