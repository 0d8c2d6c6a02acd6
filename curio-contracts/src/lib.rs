//! Trait surfaces implemented by `curio-core` and its collaborators.
//!
//! Every port the core depends on to reach the filesystem, the codec
//! backend, or the operating system's file-identity primitives lives here,
//! so the core can be exercised against mocks without touching real media.

pub mod error;
pub mod hashing;
pub mod identity;
pub mod media_backend;
pub mod media_source;

pub mod prelude {
    pub use crate::error::{CoreError, Result};
    pub use crate::hashing::ContentHasher;
    pub use crate::identity::{FileIdentity, FileIdentityResolver};
    pub use crate::media_backend::{MediaBackend, MediaMetadata};
    pub use crate::media_source::{MediaSource, MediaSourceEntry, MediaSourceStream};
}
