//! The only component aware of image/video codecs. The core treats every
//! call here as slow and blocking.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaMetadata {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub content_type: String,
}

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Returns zeroed metadata when the file is unreadable rather than
    /// erroring — callers decide whether zero dimensions are fatal.
    async fn get_metadata(&self, path: &Path) -> Result<MediaMetadata>;

    /// Writes a still JPEG with its longest edge `<= max_edge`, aspect
    /// preserved. Creates the destination directory as needed. An empty or
    /// missing output file is a [`crate::error::CoreError::BackendFailure`].
    async fn generate_thumbnail(&self, src: &Path, dst: &Path, max_edge: u32) -> Result<()>;

    /// A 256-bit perceptual hash, hex-encoded (64 hex digits). Only
    /// supported for image inputs — callers must not call this for video.
    async fn compute_perceptual_hash(&self, path: &Path) -> Result<String>;
}
