//! The error taxonomy shared by every crate in the workspace.
//!
//! Kinds, not type names: each variant corresponds to one of the kinds in
//! the propagation policy — per-item failures stay local to their caller,
//! per-scan/per-job failures are terminal for that run, cancellation is
//! never converted to success.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The referenced library, post, group, category, tag, or file does
    /// not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed path, invalid cron expression, empty name, negative
    /// number where positive is required, or a path that escapes the
    /// library root. Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A unique constraint violation: duplicate tag name, duplicate
    /// post-tag link, or a job of the same key already running.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A transient catalog write failure. The ingestion pipeline retries
    /// once; other writers surface this to their caller.
    #[error("transient storage failure: {0}")]
    TransientStorage(String),

    /// The media backend returned no output, empty output, or raised an
    /// error. Logged with the file path; the affected item is counted as
    /// failed and the scan continues.
    #[error("media backend failure: {0}")]
    BackendFailure(String),

    /// Propagated upward without transformation; never converted to a
    /// success result.
    #[error("operation cancelled")]
    Cancelled,

    /// Unrecoverable state, e.g. the database is unavailable after retry.
    /// Propagated to the job runner, which records the run as `Failed`.
    #[error("fatal: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => CoreError::NotFound(err.to_string()),
            _ => CoreError::Fatal(err.to_string()),
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => CoreError::NotFound(err.to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                CoreError::Conflict(err.to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                CoreError::TransientStorage(err.to_string())
            }
            _ => CoreError::Fatal(err.to_string()),
        }
    }
}
