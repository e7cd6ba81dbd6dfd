//! Reconciles the local log with the authoritative remote and owns the
//! eventual-consistency write pipeline.
//!
//! Remote failures never propagate as errors: a failed fetch degrades the
//! hydrate to local-only state, a failed upsert parks the entry in the retry
//! queue. Only `flush_pending` (or the next hydrate) retries; nothing runs in
//! the background.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use plan_core::merge::merge_logs;
use plan_core::model::{DayReadingLog, LogSet, UserId};
use storage::repository::{BookmarkRepository, ReadingLogRepository};

use crate::error::SyncError;
use crate::remote::RemoteLogStore;

//
// ─── WRITE PIPELINE ────────────────────────────────────────────────────────────
//

/// Where a completion write sits in the local-then-remote pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// Accepted in memory, not yet persisted anywhere.
    PendingLocal,
    /// Durable locally, remote leg outstanding.
    LocalCommitted,
    /// Durable on the remote as well; the pipeline is done.
    RemoteCommitted,
    /// Remote leg failed; the entry sits in the retry queue.
    RemoteFailed,
}

/// A log entry whose pipeline has not reached `RemoteCommitted` yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpsert {
    pub log: DayReadingLog,
    pub state: WriteState,
}

//
// ─── SYNC SERVICE ──────────────────────────────────────────────────────────────
//

/// Outcome of a cold-start hydrate.
#[derive(Debug, Clone, PartialEq)]
pub struct HydrateOutcome {
    /// The canonical set the caller should work from.
    pub logs: LogSet,
    /// False when the remote could not answer and `logs` is local-only.
    pub remote_available: bool,
    /// True when the merge rewrote the local store.
    pub repaired_local: bool,
}

/// Merge-on-load plus the retry queue for remote writes.
pub struct SyncService {
    user: UserId,
    logs: Arc<dyn ReadingLogRepository>,
    bookmarks: Arc<dyn BookmarkRepository>,
    remote: Arc<dyn RemoteLogStore>,
    pending: Mutex<Vec<PendingUpsert>>,
}

impl SyncService {
    #[must_use]
    pub fn new(
        user: UserId,
        logs: Arc<dyn ReadingLogRepository>,
        bookmarks: Arc<dyn BookmarkRepository>,
        remote: Arc<dyn RemoteLogStore>,
    ) -> Self {
        Self {
            user,
            logs,
            bookmarks,
            remote,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Cold-start reconciliation: load local, fetch remote, merge, repair
    /// whichever side is stale.
    ///
    /// An unreachable remote degrades the outcome to local-only state and is
    /// never an error. Entries the remote is missing (or holds stale) are
    /// queued and flushed best-effort before returning.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` only for local storage failures.
    pub async fn hydrate(&self) -> Result<HydrateOutcome, SyncError> {
        let local = LogSet::from_logs(self.logs.list_logs().await?);

        let remote_logs = match self.remote.fetch_logs(self.user).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!(error = %e, "remote fetch failed; continuing with local log only");
                return Ok(HydrateOutcome {
                    logs: local,
                    remote_available: false,
                    repaired_local: false,
                });
            }
        };
        let remote = LogSet::from_logs(remote_logs);

        let merged = merge_logs(&local, &remote);
        if merged.local_stale {
            let canonical: Vec<DayReadingLog> = merged.canonical.iter().cloned().collect();
            self.logs.replace_logs(&canonical).await?;
        }

        for date in &merged.push_to_remote {
            if let Some(log) = merged.canonical.get(*date) {
                self.queue().push(PendingUpsert {
                    log: log.clone(),
                    state: WriteState::LocalCommitted,
                });
            }
        }
        self.flush_pending().await;
        self.pull_bookmark().await?;

        Ok(HydrateOutcome {
            logs: merged.canonical,
            remote_available: true,
            repaired_local: merged.local_stale,
        })
    }

    /// Runs one completion through the write pipeline: local persist first,
    /// then the remote leg.
    ///
    /// Neither failure is an error to the caller. A local failure leaves the
    /// entry queued as `PendingLocal` so a later flush retries both legs; a
    /// remote failure queues it as `RemoteFailed`. The returned state is
    /// where the pipeline stopped.
    pub async fn commit(&self, log: &DayReadingLog) -> WriteState {
        let state = match self.logs.upsert_log(log).await {
            Ok(()) => WriteState::LocalCommitted,
            Err(e) => {
                warn!(date = %log.date, error = %e, "local log write failed; keeping in-memory state");
                WriteState::PendingLocal
            }
        };

        match self.remote.upsert_log(self.user, log).await {
            Ok(()) if state == WriteState::LocalCommitted => WriteState::RemoteCommitted,
            Ok(()) => {
                // Remote has it but the local row is still missing.
                self.queue().push(PendingUpsert {
                    log: log.clone(),
                    state,
                });
                state
            }
            Err(e) => {
                warn!(date = %log.date, error = %e, "remote log write failed; queued for retry");
                let state = if state == WriteState::LocalCommitted {
                    WriteState::RemoteFailed
                } else {
                    state
                };
                self.queue().push(PendingUpsert {
                    log: log.clone(),
                    state,
                });
                state
            }
        }
    }

    /// Retries every queued entry once; failures stay queued. Returns the
    /// number of entries that reached `RemoteCommitted`.
    pub async fn flush_pending(&self) -> usize {
        let drained: Vec<PendingUpsert> = self.queue().drain(..).collect();
        let mut flushed = 0;
        let mut retained = Vec::new();

        for mut entry in drained {
            if entry.state == WriteState::PendingLocal {
                match self.logs.upsert_log(&entry.log).await {
                    Ok(()) => entry.state = WriteState::LocalCommitted,
                    Err(e) => {
                        warn!(date = %entry.log.date, error = %e, "local retry failed");
                        retained.push(entry);
                        continue;
                    }
                }
            }
            match self.remote.upsert_log(self.user, &entry.log).await {
                Ok(()) => flushed += 1,
                Err(e) => {
                    warn!(date = %entry.log.date, error = %e, "remote retry failed");
                    entry.state = WriteState::RemoteFailed;
                    retained.push(entry);
                }
            }
        }

        self.queue().extend(retained);
        flushed
    }

    /// Number of writes still waiting on a remote (or local) leg.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue().len()
    }

    /// Snapshot of the retry queue, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<PendingUpsert> {
        self.queue().clone()
    }

    /// Best-effort remote bookmark push; failures are logged and dropped
    /// (bookmarks are advisory).
    pub async fn push_bookmark(&self, bookmark: &plan_core::model::Bookmark) {
        if let Err(e) = self.remote.upsert_bookmark(self.user, bookmark).await {
            warn!(error = %e, "remote bookmark push failed");
        }
    }

    /// Adopts the remote bookmark when the local slot is empty.
    async fn pull_bookmark(&self) -> Result<(), SyncError> {
        if self.bookmarks.get_bookmark().await?.is_some() {
            return Ok(());
        }
        match self.remote.fetch_bookmark(self.user).await {
            Ok(Some(bookmark)) => self.bookmarks.save_bookmark(&bookmark).await?,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "remote bookmark fetch failed"),
        }
        Ok(())
    }

    fn queue(&self) -> MutexGuard<'_, Vec<PendingUpsert>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use plan_core::calendar::add_days;
    use plan_core::model::ReadingMode;
    use plan_core::time::{fixed_now, fixed_today};
    use storage::repository::InMemoryRepository;

    use crate::remote::{InMemoryRemoteStore, ScriptedFailure};

    fn build_log(offset: i64) -> DayReadingLog {
        DayReadingLog::completed(
            add_days(fixed_today(), offset),
            ReadingMode::Scheduled,
            10,
            fixed_now() + Duration::days(offset),
            Vec::new(),
        )
    }

    fn build_service(
        repo: &InMemoryRepository,
        remote: &InMemoryRemoteStore,
    ) -> SyncService {
        SyncService::new(
            UserId::random(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(remote.clone()),
        )
    }

    #[tokio::test]
    async fn hydrate_pushes_local_only_entries_to_remote() {
        let repo = InMemoryRepository::new();
        let remote = InMemoryRemoteStore::new();
        repo.upsert_log(&build_log(-1)).await.unwrap();
        repo.upsert_log(&build_log(0)).await.unwrap();

        let sync = build_service(&repo, &remote);
        let outcome = sync.hydrate().await.unwrap();

        assert!(outcome.remote_available);
        assert!(!outcome.repaired_local);
        assert_eq!(outcome.logs.len(), 2);
        assert_eq!(remote.stored_logs().len(), 2);
        assert_eq!(sync.pending_count(), 0);
    }

    #[tokio::test]
    async fn hydrate_degrades_to_local_only_when_remote_is_down() {
        let repo = InMemoryRepository::new();
        let remote = InMemoryRemoteStore::new();
        repo.upsert_log(&build_log(0)).await.unwrap();
        remote.set_fetch_failure(Some(ScriptedFailure::Unavailable));

        let sync = build_service(&repo, &remote);
        let outcome = sync.hydrate().await.unwrap();

        assert!(!outcome.remote_available);
        assert_eq!(outcome.logs.len(), 1);
        assert!(remote.stored_logs().is_empty());
    }

    #[tokio::test]
    async fn hydrate_repairs_stale_local_from_remote() {
        let repo = InMemoryRepository::new();
        let remote = InMemoryRemoteStore::new();

        let mut stale = build_log(0);
        stale.completed = false;
        stale.points_earned = 0;
        stale.completed_at = None;
        repo.upsert_log(&stale).await.unwrap();
        remote.seed_log(build_log(0));

        let sync = build_service(&repo, &remote);
        let outcome = sync.hydrate().await.unwrap();

        assert!(outcome.repaired_local);
        assert!(outcome.logs.is_completed(fixed_today()));
        let stored = repo.list_logs().await.unwrap();
        assert!(stored[0].completed);
    }

    #[tokio::test]
    async fn commit_reports_remote_failed_and_flush_recovers() {
        let repo = InMemoryRepository::new();
        let remote = InMemoryRemoteStore::new();
        remote.set_upsert_failure(Some(ScriptedFailure::Aborted));

        let sync = build_service(&repo, &remote);
        let log = build_log(0);
        let state = sync.commit(&log).await;

        assert_eq!(state, WriteState::RemoteFailed);
        assert_eq!(sync.pending_count(), 1);
        assert_eq!(sync.pending()[0].state, WriteState::RemoteFailed);
        // The local leg still committed.
        assert_eq!(repo.list_logs().await.unwrap().len(), 1);
        assert!(remote.stored_logs().is_empty());

        // Still down: flushing changes nothing.
        assert_eq!(sync.flush_pending().await, 0);
        assert_eq!(sync.pending_count(), 1);

        remote.set_upsert_failure(None);
        assert_eq!(sync.flush_pending().await, 1);
        assert_eq!(sync.pending_count(), 0);
        assert_eq!(remote.stored_logs(), vec![log]);
    }

    #[tokio::test]
    async fn commit_reaches_remote_committed_when_both_legs_succeed() {
        let repo = InMemoryRepository::new();
        let remote = InMemoryRemoteStore::new();
        let sync = build_service(&repo, &remote);

        let state = sync.commit(&build_log(0)).await;
        assert_eq!(state, WriteState::RemoteCommitted);
        assert_eq!(sync.pending_count(), 0);
        assert_eq!(remote.stored_logs().len(), 1);
    }

    #[tokio::test]
    async fn hydrate_adopts_remote_bookmark_when_local_is_empty() {
        let repo = InMemoryRepository::new();
        let remote = InMemoryRemoteStore::new();
        let sync = build_service(&repo, &remote);

        let bookmark = plan_core::model::Bookmark {
            date: fixed_today(),
            day_id: plan_core::model::DayId::new(4),
            scroll_offset: 0.3,
        };
        sync.push_bookmark(&bookmark).await;

        sync.hydrate().await.unwrap();
        assert_eq!(repo.get_bookmark().await.unwrap(), Some(bookmark));
    }
}
