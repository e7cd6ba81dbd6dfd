use std::sync::Arc;

use tracing::warn;

use plan_core::model::UserId;
use storage::repository::Storage;

use crate::error::AppServicesError;
use crate::remote::RemoteLogStore;
use crate::session::{PlanContent, PlanState, ReadingPlanService};
use crate::sync::SyncService;
use crate::Clock;

/// Assembles the plan services over one storage backend and one remote.
///
/// Built once at startup; `init` produces the caller-owned `PlanState` and
/// `dispose` drains the retry queue on the way out.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    sync: Arc<SyncService>,
    plan: Arc<ReadingPlanService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        user: UserId,
        remote: Arc<dyn RemoteLogStore>,
        content: Arc<dyn PlanContent>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(storage, clock, user, remote, content))
    }

    /// Build services over an already-constructed storage aggregate.
    #[must_use]
    pub fn with_storage(
        storage: Storage,
        clock: Clock,
        user: UserId,
        remote: Arc<dyn RemoteLogStore>,
        content: Arc<dyn PlanContent>,
    ) -> Self {
        let sync = Arc::new(SyncService::new(
            user,
            Arc::clone(&storage.logs),
            Arc::clone(&storage.bookmarks),
            remote,
        ));
        let plan = Arc::new(ReadingPlanService::new(
            clock,
            content,
            Arc::clone(&storage.bookmarks),
            Arc::clone(&storage.settings),
            Arc::clone(&storage.stats_cache),
            Arc::clone(&sync),
        ));
        Self { clock, sync, plan }
    }

    /// Cold-start hydrate: reconcile local and remote logs and hand back the
    /// working state with stats derived as of today.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` on local storage failures; an unreachable
    /// remote only degrades the state to local-only.
    pub async fn init(&self) -> Result<PlanState, AppServicesError> {
        let outcome = self.sync.hydrate().await?;
        Ok(PlanState::new(outcome.logs, self.clock.today()))
    }

    /// Final flush of queued remote writes. Entries that still fail stay
    /// durable locally and will be pushed by the next hydrate.
    pub async fn dispose(&self) {
        self.sync.flush_pending().await;
        let remaining = self.sync.pending_count();
        if remaining > 0 {
            warn!(remaining, "shutting down with unsynced log entries");
        }
    }

    #[must_use]
    pub fn plan(&self) -> Arc<ReadingPlanService> {
        Arc::clone(&self.plan)
    }

    #[must_use]
    pub fn sync(&self) -> Arc<SyncService> {
        Arc::clone(&self.sync)
    }
}
