//! Filesystem-stable file identity resolution.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// A filesystem-stable `(device, value)` pair, e.g. volume serial + file
/// index on Windows, or device + inode on Unix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    pub device: String,
    pub value: String,
}

impl FileIdentity {
    /// The composite key used to index posts by identity, matching the
    /// `"device|value"` key the sync processor builds from catalog rows.
    pub fn composite_key(&self) -> String {
        format!("{}|{}", self.device, self.value)
    }
}

/// Resolves a stable identity for a file by opening it once and querying a
/// platform primitive. Returns `None` on platforms that cannot provide a
/// stable identity — callers then fall back to (path, size, mtime)
/// equality and cannot detect moves.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait FileIdentityResolver: Send + Sync {
    async fn try_resolve(&self, full_path: &Path) -> Result<Option<FileIdentity>>;
}
