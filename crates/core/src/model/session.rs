use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::DayId;
use crate::model::log::ReadingMode;

/// Resume position within a day's content. Advisory only: losing a bookmark
/// never loses a completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub date: NaiveDate,
    pub day_id: DayId,
    pub scroll_offset: f64,
}

/// Ephemeral in-memory state for an active reading session.
///
/// Created by "start reading", mutated by scroll events, cleared on
/// successful completion. Never persisted as a whole; only the bookmark is.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingSession {
    day_id: DayId,
    mode: ReadingMode,
    date: NaiveDate,
    started_at: DateTime<Utc>,
    bookmark: Option<Bookmark>,
}

impl ReadingSession {
    #[must_use]
    pub fn new(day_id: DayId, mode: ReadingMode, date: NaiveDate, started_at: DateTime<Utc>) -> Self {
        Self {
            day_id,
            mode,
            date,
            started_at,
            bookmark: None,
        }
    }

    #[must_use]
    pub fn day_id(&self) -> DayId {
        self.day_id
    }

    #[must_use]
    pub fn mode(&self) -> ReadingMode {
        self.mode
    }

    /// The plan date this session will complete.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn bookmark(&self) -> Option<&Bookmark> {
        self.bookmark.as_ref()
    }

    /// Records the latest scroll position.
    pub fn set_bookmark(&mut self, scroll_offset: f64) {
        self.bookmark = Some(Bookmark {
            date: self.date,
            day_id: self.day_id,
            scroll_offset,
        });
    }

    /// Seconds the session has been active at `now`. Zero if `now` is
    /// somehow before the start (clock skew).
    #[must_use]
    pub fn active_seconds(&self, now: DateTime<Utc>) -> u32 {
        let secs = now.signed_duration_since(self.started_at).num_seconds();
        u32::try_from(secs).unwrap_or(0)
    }
}
