//! The lazy, finite, non-restartable directory enumerator.

use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::Result;

/// One file discovered under a library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSourceEntry {
    pub full_path: PathBuf,
    pub relative_path: String,
    pub size_bytes: u64,
    pub last_modified_utc: DateTime<Utc>,
}

pub type MediaSourceStream = Pin<Box<dyn Stream<Item = MediaSourceEntry> + Send>>;

/// A lazy asynchronous enumerator over a directory tree.
///
/// The returned stream is finite and not restartable; callers must not
/// depend on item ordering. Files that cannot be stat'ed, or that carry
/// system/hidden/temporary attributes, are silently skipped rather than
/// surfaced as errors.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Enumerate every supported-media file under `root`.
    fn enumerate(&self, root: &Path) -> MediaSourceStream;

    /// Count the files `enumerate` would yield. Used for progress
    /// reporting only — not authoritative, and may race with `enumerate`
    /// on a live filesystem.
    async fn count(&self, root: &Path) -> Result<u64>;
}
