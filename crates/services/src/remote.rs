//! Remote side of the reading log: a thin fetch/upsert contract over rows
//! keyed by `(user_id, date)`, plus the single advisory bookmark row.
//!
//! The remote is authoritative in merges but optional at runtime: every
//! adapter error degrades the caller to local-only operation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use plan_core::model::{Bookmark, DayId, DayReadingLog, ReadingMode, SectionId, UserId};

use crate::error::{RemoteConfigError, RemoteError};

//
// ─── CONTRACT ──────────────────────────────────────────────────────────────────
//

/// Authoritative store for a user's reading log.
#[async_trait]
pub trait RemoteLogStore: Send + Sync {
    /// Fetch every log row for `user`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` when the remote cannot answer; callers degrade
    /// to local-only state.
    async fn fetch_logs(&self, user: UserId) -> Result<Vec<DayReadingLog>, RemoteError>;

    /// Insert or replace the row for `(user, log.date)`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on failure; callers queue the write for retry.
    async fn upsert_log(&self, user: UserId, log: &DayReadingLog) -> Result<(), RemoteError>;

    /// Fetch the user's resume bookmark, if any.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` when the remote cannot answer.
    async fn fetch_bookmark(&self, user: UserId) -> Result<Option<Bookmark>, RemoteError>;

    /// Insert or replace the user's resume bookmark.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on failure; bookmark pushes are best-effort.
    async fn upsert_bookmark(&self, user: UserId, bookmark: &Bookmark) -> Result<(), RemoteError>;
}

//
// ─── HTTP ADAPTER ──────────────────────────────────────────────────────────────
//

/// PostgREST-style HTTP adapter: one table per record kind, rows filtered by
/// `user_id`, upserts via `Prefer: resolution=merge-duplicates`.
#[derive(Clone, Debug)]
pub struct HttpRemoteStore {
    client: Client,
    logs_url: Url,
    bookmarks_url: Url,
    api_key: Option<String>,
}

impl HttpRemoteStore {
    /// Build an adapter rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteConfigError` when the base url does not parse or cannot
    /// carry table path segments.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, RemoteConfigError> {
        let base = Url::parse(base_url)?;
        let logs_url = join_table(&base, "reading_logs")?;
        let bookmarks_url = join_table(&base, "reading_bookmarks")?;
        Ok(Self {
            client: Client::new(),
            logs_url,
            bookmarks_url,
            api_key,
        })
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("apikey", key).bearer_auth(key),
            None => builder,
        }
    }

    async fn fetch_rows<T: serde::de::DeserializeOwned>(
        &self,
        table_url: &Url,
        user: UserId,
    ) -> Result<Vec<T>, RemoteError> {
        let mut url = table_url.clone();
        url.query_pairs_mut()
            .append_pair("user_id", &format!("eq.{}", user.value()))
            .append_pair("select", "*");

        let response = self
            .authed(self.client.get(url))
            .send()
            .await
            .map_err(map_transport)?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn push_row<T: Serialize>(&self, table_url: &Url, row: &T) -> Result<(), RemoteError> {
        let response = self
            .authed(self.client.post(table_url.clone()))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[row])
            .send()
            .await
            .map_err(map_transport)?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteLogStore for HttpRemoteStore {
    async fn fetch_logs(&self, user: UserId) -> Result<Vec<DayReadingLog>, RemoteError> {
        let rows: Vec<RemoteLogRow> = self.fetch_rows(&self.logs_url, user).await?;
        Ok(rows.into_iter().map(RemoteLogRow::into_log).collect())
    }

    async fn upsert_log(&self, user: UserId, log: &DayReadingLog) -> Result<(), RemoteError> {
        self.push_row(&self.logs_url, &RemoteLogRow::from_log(user, log))
            .await
    }

    async fn fetch_bookmark(&self, user: UserId) -> Result<Option<Bookmark>, RemoteError> {
        let rows: Vec<RemoteBookmarkRow> = self.fetch_rows(&self.bookmarks_url, user).await?;
        Ok(rows.into_iter().next().map(RemoteBookmarkRow::into_bookmark))
    }

    async fn upsert_bookmark(&self, user: UserId, bookmark: &Bookmark) -> Result<(), RemoteError> {
        self.push_row(
            &self.bookmarks_url,
            &RemoteBookmarkRow::from_bookmark(user, bookmark),
        )
        .await
    }
}

fn join_table(base: &Url, table: &str) -> Result<Url, RemoteConfigError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| RemoteConfigError::NotABase(base.clone()))?
        .pop_if_empty()
        .push(table);
    Ok(url)
}

fn map_transport(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Aborted
    } else if e.is_connect() {
        RemoteError::Unavailable(e.to_string())
    } else {
        RemoteError::Http(e)
    }
}

/// A 404 route or an "undefined table" body means the log tables were never
/// provisioned for this deployment; the sync layer treats that the same as an
/// unreachable remote.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(RemoteError::SchemaMissing);
    }
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if body.contains("does not exist") || body.contains("42P01") {
        return Err(RemoteError::SchemaMissing);
    }
    Err(RemoteError::HttpStatus(status))
}

//
// ─── WIRE ROWS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize, Deserialize)]
struct RemoteLogRow {
    user_id: Uuid,
    date: NaiveDate,
    mode: ReadingMode,
    completed: bool,
    points_earned: u32,
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    section_ids: Vec<u32>,
}

impl RemoteLogRow {
    fn from_log(user: UserId, log: &DayReadingLog) -> Self {
        Self {
            user_id: user.value(),
            date: log.date,
            mode: log.mode,
            completed: log.completed,
            points_earned: log.points_earned,
            completed_at: log.completed_at,
            section_ids: log.section_ids.iter().map(SectionId::value).collect(),
        }
    }

    fn into_log(self) -> DayReadingLog {
        DayReadingLog {
            date: self.date,
            mode: self.mode,
            completed: self.completed,
            points_earned: self.points_earned,
            completed_at: self.completed_at,
            section_ids: self.section_ids.into_iter().map(SectionId::new).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RemoteBookmarkRow {
    user_id: Uuid,
    date: NaiveDate,
    day_id: u32,
    scroll_offset: f64,
}

impl RemoteBookmarkRow {
    fn from_bookmark(user: UserId, bookmark: &Bookmark) -> Self {
        Self {
            user_id: user.value(),
            date: bookmark.date,
            day_id: bookmark.day_id.value(),
            scroll_offset: bookmark.scroll_offset,
        }
    }

    fn into_bookmark(self) -> Bookmark {
        Bookmark {
            date: self.date,
            day_id: DayId::new(self.day_id),
            scroll_offset: self.scroll_offset,
        }
    }
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

/// Failure mode an `InMemoryRemoteStore` can be scripted to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    Unavailable,
    SchemaMissing,
    Aborted,
}

impl ScriptedFailure {
    fn into_error(self) -> RemoteError {
        match self {
            Self::Unavailable => RemoteError::Unavailable("scripted".into()),
            Self::SchemaMissing => RemoteError::SchemaMissing,
            Self::Aborted => RemoteError::Aborted,
        }
    }
}

/// In-memory remote for tests and prototyping. Fetches and upserts can each
/// be scripted to fail so callers can exercise the degraded paths.
#[derive(Clone, Default)]
pub struct InMemoryRemoteStore {
    logs: Arc<Mutex<HashMap<NaiveDate, DayReadingLog>>>,
    bookmark: Arc<Mutex<Option<Bookmark>>>,
    fetch_failure: Arc<Mutex<Option<ScriptedFailure>>>,
    upsert_failure: Arc<Mutex<Option<ScriptedFailure>>>,
}

impl InMemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a log row, bypassing the scripted failures.
    pub fn seed_log(&self, log: DayReadingLog) {
        self.lock(&self.logs).insert(log.date, log);
    }

    /// Make every subsequent fetch fail with `failure` (or succeed again on
    /// `None`).
    pub fn set_fetch_failure(&self, failure: Option<ScriptedFailure>) {
        *self.lock(&self.fetch_failure) = failure;
    }

    /// Make every subsequent upsert fail with `failure` (or succeed again on
    /// `None`).
    pub fn set_upsert_failure(&self, failure: Option<ScriptedFailure>) {
        *self.lock(&self.upsert_failure) = failure;
    }

    /// Snapshot of stored rows in ascending date order.
    #[must_use]
    pub fn stored_logs(&self) -> Vec<DayReadingLog> {
        let mut logs: Vec<DayReadingLog> = self.lock(&self.logs).values().cloned().collect();
        logs.sort_by_key(|log| log.date);
        logs
    }

    fn lock<'a, T>(&self, cell: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        cell.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl RemoteLogStore for InMemoryRemoteStore {
    async fn fetch_logs(&self, _user: UserId) -> Result<Vec<DayReadingLog>, RemoteError> {
        if let Some(failure) = *self.lock(&self.fetch_failure) {
            return Err(failure.into_error());
        }
        Ok(self.stored_logs())
    }

    async fn upsert_log(&self, _user: UserId, log: &DayReadingLog) -> Result<(), RemoteError> {
        if let Some(failure) = *self.lock(&self.upsert_failure) {
            return Err(failure.into_error());
        }
        self.lock(&self.logs).insert(log.date, log.clone());
        Ok(())
    }

    async fn fetch_bookmark(&self, _user: UserId) -> Result<Option<Bookmark>, RemoteError> {
        if let Some(failure) = *self.lock(&self.fetch_failure) {
            return Err(failure.into_error());
        }
        Ok(*self.lock(&self.bookmark))
    }

    async fn upsert_bookmark(&self, _user: UserId, bookmark: &Bookmark) -> Result<(), RemoteError> {
        if let Some(failure) = *self.lock(&self.upsert_failure) {
            return Err(failure.into_error());
        }
        *self.lock(&self.bookmark) = Some(*bookmark);
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::time::{fixed_now, fixed_today};

    fn build_log() -> DayReadingLog {
        DayReadingLog::completed(
            fixed_today(),
            ReadingMode::Scheduled,
            10,
            fixed_now(),
            vec![SectionId::new(1), SectionId::new(2)],
        )
    }

    #[test]
    fn log_row_round_trips() {
        let user = UserId::random();
        let log = build_log();
        let row = RemoteLogRow::from_log(user, &log);

        let encoded = serde_json::to_string(&row).unwrap();
        let decoded: RemoteLogRow = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.into_log(), log);
    }

    #[test]
    fn log_row_defaults_missing_section_ids() {
        let raw = format!(
            r#"{{"user_id":"{}","date":"2024-03-11","mode":"scheduled","completed":true,"points_earned":10,"completed_at":null}}"#,
            Uuid::new_v4()
        );
        let row: RemoteLogRow = serde_json::from_str(&raw).unwrap();
        assert!(row.into_log().section_ids.is_empty());
    }

    #[test]
    fn base_url_keeps_existing_path_segments() {
        let store = HttpRemoteStore::new("https://example.com/rest/v1/", None).unwrap();
        assert_eq!(store.logs_url.path(), "/rest/v1/reading_logs");
        assert_eq!(store.bookmarks_url.path(), "/rest/v1/reading_bookmarks");

        let store = HttpRemoteStore::new("https://example.com", None).unwrap();
        assert_eq!(store.logs_url.path(), "/reading_logs");
    }

    #[test]
    fn rejects_non_base_urls() {
        let err = HttpRemoteStore::new("mailto:reader@example.com", None).unwrap_err();
        assert!(matches!(err, RemoteConfigError::NotABase(_)));
    }

    #[tokio::test]
    async fn scripted_failures_cover_both_directions() {
        let remote = InMemoryRemoteStore::new();
        let user = UserId::random();
        remote.seed_log(build_log());

        remote.set_fetch_failure(Some(ScriptedFailure::SchemaMissing));
        assert!(matches!(
            remote.fetch_logs(user).await,
            Err(RemoteError::SchemaMissing)
        ));

        remote.set_fetch_failure(None);
        assert_eq!(remote.fetch_logs(user).await.unwrap().len(), 1);

        remote.set_upsert_failure(Some(ScriptedFailure::Unavailable));
        assert!(remote.upsert_log(user, &build_log()).await.is_err());
    }
}
