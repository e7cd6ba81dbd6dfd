//! Shared error types for the services crate.

use thiserror::Error;
use url::Url;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by remote log store adapters.
///
/// Callers in the sync layer treat every variant as "remote sync unavailable
/// right now" and degrade to local-only operation; none of these is fatal.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("remote store unreachable: {0}")]
    Unavailable(String),
    #[error("remote schema is missing the reading log tables")]
    SchemaMissing,
    #[error("remote request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("remote request aborted")]
    Aborted,
}

/// Errors building an `HttpRemoteStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteConfigError {
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error("remote base url cannot hold path segments: {0}")]
    NotABase(Url),
}

/// Errors emitted by `SyncService`.
///
/// Only local storage failures surface here; remote failures are queued for
/// retry instead of propagating.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ReadingPlanService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}
