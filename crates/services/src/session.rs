//! Day-completion workflow: start a session, track the bookmark, and run the
//! guarded, idempotent completion pipeline.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use plan_core::missed::missed_days;
use plan_core::model::{
    DayId, DayReadingLog, LogSet, ReadingMode, ReadingSession, ReadingSettings, SectionId,
    UserStats,
};
use plan_core::rewards::{calculate_reward, RewardBreakdown};
use plan_core::stats::compute_stats;
use plan_core::Clock;
use storage::repository::{BookmarkRepository, SettingsRepository, StatsCacheRepository};

use crate::error::SessionError;
use crate::sync::{SyncService, WriteState};

//
// ─── PLAN CONTENT ──────────────────────────────────────────────────────────────
//

/// What the reader sees for one plan day. The tracker only needs the section
/// list (recorded on completion) and a length estimate for the engagement
/// floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayContent {
    pub section_ids: Vec<SectionId>,
    pub estimated_seconds: u32,
}

/// Lookup into the reading plan's content. Content loading itself lives
/// outside this crate; implementors only answer "what is day N".
pub trait PlanContent: Send + Sync {
    fn day(&self, day: DayId) -> Option<DayContent>;
}

/// Fixed content table, enough for tests and seeded demos.
#[derive(Debug, Clone, Default)]
pub struct StaticPlanContent {
    days: std::collections::HashMap<u32, DayContent>,
}

impl StaticPlanContent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_day(mut self, day: DayId, content: DayContent) -> Self {
        self.days.insert(day.value(), content);
        self
    }
}

impl PlanContent for StaticPlanContent {
    fn day(&self, day: DayId) -> Option<DayContent> {
        self.days.get(&day.value()).cloned()
    }
}

const MIN_ENGAGEMENT_SECONDS: u32 = 60;
const MAX_ENGAGEMENT_SECONDS: u32 = 240;

/// Seconds a reader must stay in the session before a completion counts:
/// half the estimated read time, clamped to [60, 240].
#[must_use]
pub fn required_engagement_seconds(estimated_seconds: u32) -> u32 {
    (estimated_seconds / 2).clamp(MIN_ENGAGEMENT_SECONDS, MAX_ENGAGEMENT_SECONDS)
}

//
// ─── PLAN STATE ────────────────────────────────────────────────────────────────
//

/// Caller-owned working state: the canonical log set and the stats derived
/// from it. Stats are never mutated incrementally, always recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanState {
    pub logs: LogSet,
    pub stats: UserStats,
}

impl PlanState {
    /// Builds state with stats derived from `logs` as of `today`.
    #[must_use]
    pub fn new(logs: LogSet, today: NaiveDate) -> Self {
        let stats = compute_stats(&logs, today);
        Self { logs, stats }
    }
}

//
// ─── COMPLETION OUTCOME ────────────────────────────────────────────────────────
//

/// Why a completion attempt was refused. Rejections are no-ops: no state,
/// local or remote, changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The session targets a date after today.
    FutureDate,
    /// The date already has a completed entry; this makes retries idempotent.
    AlreadyCompleted,
    /// No content exists for the session's day.
    MissingContent,
    /// The session was too short to plausibly be a reading.
    InsufficientEngagement { required: u32, actual: u32 },
}

/// Result of `complete_reading`.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Completed {
        log: DayReadingLog,
        reward: RewardBreakdown,
        write: WriteState,
    },
    Rejected(RejectReason),
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Orchestrates reading sessions against caller-owned `PlanState`.
pub struct ReadingPlanService {
    clock: Clock,
    content: Arc<dyn PlanContent>,
    bookmarks: Arc<dyn BookmarkRepository>,
    settings: Arc<dyn SettingsRepository>,
    stats_cache: Arc<dyn StatsCacheRepository>,
    sync: Arc<SyncService>,
}

impl ReadingPlanService {
    #[must_use]
    pub fn new(
        clock: Clock,
        content: Arc<dyn PlanContent>,
        bookmarks: Arc<dyn BookmarkRepository>,
        settings: Arc<dyn SettingsRepository>,
        stats_cache: Arc<dyn StatsCacheRepository>,
        sync: Arc<SyncService>,
    ) -> Self {
        Self {
            clock,
            content,
            bookmarks,
            settings,
            stats_cache,
            sync,
        }
    }

    /// Opens a session for `day`. `date` defaults to today; makeup sessions
    /// pass the missed date instead. A bookmark left over from a different
    /// date is cleared so it cannot resume into the wrong day.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` on local storage failures.
    pub async fn start_reading(
        &self,
        day: DayId,
        mode: ReadingMode,
        date: Option<NaiveDate>,
    ) -> Result<ReadingSession, SessionError> {
        let date = date.unwrap_or_else(|| self.clock.today());
        if let Some(bookmark) = self.bookmarks.get_bookmark().await? {
            if bookmark.date != date {
                self.bookmarks.clear_bookmark().await?;
            }
        }
        Ok(ReadingSession::new(day, mode, date, self.clock.now()))
    }

    /// Records the scroll position locally and pushes it to the remote
    /// best-effort.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the local save fails; remote failures are
    /// swallowed.
    pub async fn update_bookmark(
        &self,
        session: &mut ReadingSession,
        scroll_offset: f64,
    ) -> Result<(), SessionError> {
        session.set_bookmark(scroll_offset);
        if let Some(bookmark) = session.bookmark() {
            self.bookmarks.save_bookmark(bookmark).await?;
            self.sync.push_bookmark(bookmark).await;
        }
        Ok(())
    }

    /// What completing `date` in `mode` right now would earn. Commit-free:
    /// no state changes, calling it any number of times is safe.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if settings cannot be read.
    pub async fn preview_points(
        &self,
        state: &PlanState,
        date: NaiveDate,
        mode: ReadingMode,
    ) -> Result<RewardBreakdown, SessionError> {
        let settings = self.load_settings().await?;
        Ok(calculate_reward(
            &state.logs,
            date,
            mode,
            settings.weekly_target(),
            self.clock.now(),
        ))
    }

    /// Runs the completion pipeline for `session`.
    ///
    /// Guards first (future date, already completed, missing content,
    /// engagement floor); a failed guard is a `Rejected` outcome and a
    /// complete no-op. A passing attempt computes the reward, updates
    /// `state` optimistically, recomputes stats, then persists: local log
    /// write, stats cache, remote upsert. Local and remote failures are
    /// logged and absorbed so the in-memory state always reflects the
    /// completion; the returned `WriteState` says how far it got.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if settings cannot be read.
    pub async fn complete_reading(
        &self,
        state: &mut PlanState,
        session: &ReadingSession,
    ) -> Result<CompletionOutcome, SessionError> {
        let now = self.clock.now();
        let today = self.clock.today();

        if session.date() > today {
            return Ok(CompletionOutcome::Rejected(RejectReason::FutureDate));
        }
        if state.logs.is_completed(session.date()) {
            return Ok(CompletionOutcome::Rejected(RejectReason::AlreadyCompleted));
        }
        let Some(content) = self.content.day(session.day_id()) else {
            return Ok(CompletionOutcome::Rejected(RejectReason::MissingContent));
        };
        let required = required_engagement_seconds(content.estimated_seconds);
        let actual = session.active_seconds(now);
        if actual < required {
            return Ok(CompletionOutcome::Rejected(
                RejectReason::InsufficientEngagement { required, actual },
            ));
        }

        let settings = self.load_settings().await?;
        let reward = calculate_reward(
            &state.logs,
            session.date(),
            session.mode(),
            settings.weekly_target(),
            now,
        );
        let log = DayReadingLog::completed(
            session.date(),
            session.mode(),
            reward.total(),
            now,
            content.section_ids,
        );

        state.logs.insert(log.clone());
        state.stats = compute_stats(&state.logs, today);

        let write = self.sync.commit(&log).await;
        if let Err(e) = self.stats_cache.save_stats(&state.stats).await {
            warn!(error = %e, "stats cache write failed");
        }
        if let Err(e) = self.bookmarks.clear_bookmark().await {
            warn!(error = %e, "bookmark clear failed");
        }

        Ok(CompletionOutcome::Completed { log, reward, write })
    }

    /// Scheduled days inside the lookback window the reader still owes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if settings cannot be read.
    pub async fn missed_days(
        &self,
        state: &PlanState,
        lookback_days: u32,
    ) -> Result<Vec<NaiveDate>, SessionError> {
        let settings = self.load_settings().await?;
        Ok(missed_days(
            &state.logs,
            lookback_days,
            settings.weekly_target(),
            settings.plan_start(),
            self.clock.today(),
        ))
    }

    /// Re-derives stats from the canonical set as of today.
    pub fn recompute_stats(&self, state: &mut PlanState) {
        state.stats = compute_stats(&state.logs, self.clock.today());
    }

    async fn load_settings(&self) -> Result<ReadingSettings, SessionError> {
        Ok(self.settings.get_settings().await?.unwrap_or_default())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
