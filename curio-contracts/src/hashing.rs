//! The content fingerprint used to identify file content independent of
//! its path.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Computes a short, fast, non-cryptographic content fingerprint.
///
/// Implementations must be deterministic: identical bytes always produce
/// identical hashes. Output is a 16-character lowercase hex string.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ContentHasher: Send + Sync {
    async fn compute_content_hash(&self, path: &Path) -> Result<String>;
}
