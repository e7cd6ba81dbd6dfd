use async_trait::async_trait;
use chrono::NaiveDate;
use plan_core::model::{Bookmark, DayReadingLog, ReadingSettings, UserStats};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the on-device reading log, the local side of the
/// canonical set. The date is the natural key; upserting an existing date
/// replaces the row.
#[async_trait]
pub trait ReadingLogRepository: Send + Sync {
    /// Persist or update the entry for the log's date.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn upsert_log(&self, log: &DayReadingLog) -> Result<(), StorageError>;

    /// Replace the whole stored set with `logs` (post-merge rewrite).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rewrite fails.
    async fn replace_logs(&self, logs: &[DayReadingLog]) -> Result<(), StorageError>;

    /// All stored entries in ascending date order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_logs(&self) -> Result<Vec<DayReadingLog>, StorageError>;

    /// Fetch a single entry by date.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures. A missing date is `Ok(None)`.
    async fn get_log(&self, date: NaiveDate) -> Result<Option<DayReadingLog>, StorageError>;
}

/// Single active resume bookmark (advisory, not a correctness boundary).
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Persist the bookmark, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bookmark cannot be stored.
    async fn save_bookmark(&self, bookmark: &Bookmark) -> Result<(), StorageError>;

    /// Fetch the current bookmark, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_bookmark(&self) -> Result<Option<Bookmark>, StorageError>;

    /// Remove the bookmark. Clearing an absent bookmark is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on write failures.
    async fn clear_bookmark(&self) -> Result<(), StorageError>;
}

/// Per-user reading plan settings.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Persist the settings record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be stored.
    async fn save_settings(&self, settings: &ReadingSettings) -> Result<(), StorageError>;

    /// Fetch the settings record, if one was ever saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_settings(&self) -> Result<Option<ReadingSettings>, StorageError>;
}

/// Cached display stats. Never a source of truth: always recomputed from the
/// canonical log set, stored only so the UI has data before the first hydrate.
#[async_trait]
pub trait StatsCacheRepository: Send + Sync {
    /// Persist the stats snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save_stats(&self, stats: &UserStats) -> Result<(), StorageError>;

    /// Fetch the cached snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_stats(&self) -> Result<Option<UserStats>, StorageError>;
}

/// Opaque key-value records: user profile blob, app settings blob, and the
/// content-version marker all live here as plain strings.
#[async_trait]
pub trait AppStateRepository: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on write failures.
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Fetch the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures. A missing key is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    logs: Arc<Mutex<HashMap<NaiveDate, DayReadingLog>>>,
    bookmark: Arc<Mutex<Option<Bookmark>>>,
    settings: Arc<Mutex<Option<ReadingSettings>>>,
    stats: Arc<Mutex<Option<UserStats>>>,
    app_state: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ReadingLogRepository for InMemoryRepository {
    async fn upsert_log(&self, log: &DayReadingLog) -> Result<(), StorageError> {
        let mut guard = self.logs.lock().map_err(poisoned)?;
        guard.insert(log.date, log.clone());
        Ok(())
    }

    async fn replace_logs(&self, logs: &[DayReadingLog]) -> Result<(), StorageError> {
        let mut guard = self.logs.lock().map_err(poisoned)?;
        guard.clear();
        for log in logs {
            guard.insert(log.date, log.clone());
        }
        Ok(())
    }

    async fn list_logs(&self) -> Result<Vec<DayReadingLog>, StorageError> {
        let guard = self.logs.lock().map_err(poisoned)?;
        let mut logs: Vec<DayReadingLog> = guard.values().cloned().collect();
        logs.sort_by_key(|log| log.date);
        Ok(logs)
    }

    async fn get_log(&self, date: NaiveDate) -> Result<Option<DayReadingLog>, StorageError> {
        let guard = self.logs.lock().map_err(poisoned)?;
        Ok(guard.get(&date).cloned())
    }
}

#[async_trait]
impl BookmarkRepository for InMemoryRepository {
    async fn save_bookmark(&self, bookmark: &Bookmark) -> Result<(), StorageError> {
        *self.bookmark.lock().map_err(poisoned)? = Some(*bookmark);
        Ok(())
    }

    async fn get_bookmark(&self) -> Result<Option<Bookmark>, StorageError> {
        Ok(*self.bookmark.lock().map_err(poisoned)?)
    }

    async fn clear_bookmark(&self) -> Result<(), StorageError> {
        *self.bookmark.lock().map_err(poisoned)? = None;
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for InMemoryRepository {
    async fn save_settings(&self, settings: &ReadingSettings) -> Result<(), StorageError> {
        *self.settings.lock().map_err(poisoned)? = Some(*settings);
        Ok(())
    }

    async fn get_settings(&self) -> Result<Option<ReadingSettings>, StorageError> {
        Ok(*self.settings.lock().map_err(poisoned)?)
    }
}

#[async_trait]
impl StatsCacheRepository for InMemoryRepository {
    async fn save_stats(&self, stats: &UserStats) -> Result<(), StorageError> {
        *self.stats.lock().map_err(poisoned)? = Some(stats.clone());
        Ok(())
    }

    async fn get_stats(&self) -> Result<Option<UserStats>, StorageError> {
        Ok(self.stats.lock().map_err(poisoned)?.clone())
    }
}

#[async_trait]
impl AppStateRepository for InMemoryRepository {
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.app_state.lock().map_err(poisoned)?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.app_state.lock().map_err(poisoned)?;
        Ok(guard.get(key).cloned())
    }
}

/// Aggregates the local repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub logs: Arc<dyn ReadingLogRepository>,
    pub bookmarks: Arc<dyn BookmarkRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub stats_cache: Arc<dyn StatsCacheRepository>,
    pub app_state: Arc<dyn AppStateRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            logs: Arc::new(repo.clone()),
            bookmarks: Arc::new(repo.clone()),
            settings: Arc::new(repo.clone()),
            stats_cache: Arc::new(repo.clone()),
            app_state: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::calendar::add_days;
    use plan_core::model::{DayId, ReadingMode};
    use plan_core::time::{fixed_now, fixed_today};

    fn build_log(offset: i64) -> DayReadingLog {
        DayReadingLog::completed(
            add_days(fixed_today(), offset),
            ReadingMode::Scheduled,
            10,
            fixed_now(),
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn upsert_replaces_entry_for_same_date() {
        let repo = InMemoryRepository::new();
        repo.upsert_log(&build_log(0)).await.unwrap();

        let mut updated = build_log(0);
        updated.points_earned = 30;
        repo.upsert_log(&updated).await.unwrap();

        let logs = repo.list_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].points_earned, 30);
    }

    #[tokio::test]
    async fn replace_logs_rewrites_the_whole_set() {
        let repo = InMemoryRepository::new();
        repo.upsert_log(&build_log(-3)).await.unwrap();

        repo.replace_logs(&[build_log(-1), build_log(0)]).await.unwrap();
        let logs = repo.list_logs().await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].date, add_days(fixed_today(), -1));
        assert!(repo.get_log(add_days(fixed_today(), -3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bookmark_is_single_slot() {
        let repo = InMemoryRepository::new();
        assert!(repo.get_bookmark().await.unwrap().is_none());

        let bookmark = Bookmark {
            date: fixed_today(),
            day_id: DayId::new(5),
            scroll_offset: 0.5,
        };
        repo.save_bookmark(&bookmark).await.unwrap();
        assert_eq!(repo.get_bookmark().await.unwrap(), Some(bookmark));

        repo.clear_bookmark().await.unwrap();
        assert!(repo.get_bookmark().await.unwrap().is_none());
        // Clearing again is not an error.
        repo.clear_bookmark().await.unwrap();
    }

    #[tokio::test]
    async fn app_state_round_trips_opaque_values() {
        let repo = InMemoryRepository::new();
        assert!(repo.get("content_version").await.unwrap().is_none());
        repo.put("content_version", "2024.1").await.unwrap();
        assert_eq!(
            repo.get("content_version").await.unwrap().as_deref(),
            Some("2024.1")
        );
    }
}
