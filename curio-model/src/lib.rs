//! Shared data model for the Curio media catalog.
//!
//! Plain structs mirroring the relational catalog schema, independent of
//! any particular storage engine. Feature-gated `serde` and `sqlx` derives
//! let downstream crates opt into only what they need.

pub mod duplicate;
pub mod ids;
pub mod job;
pub mod library;
pub mod log;
pub mod post;
pub mod tag;

pub mod prelude {
    pub use crate::duplicate::{DuplicateGroup, DuplicateGroupEntry, DuplicateGroupType, ExcludedFile};
    pub use crate::ids::*;
    pub use crate::job::{JobExecution, JobStatus, ScheduledJob};
    pub use crate::library::{Library, LibraryIgnoredPath};
    pub use crate::log::AppLogEntry;
    pub use crate::post::{Post, PostSource, PostTagLink, TagSource};
    pub use crate::tag::{Tag, TagCategory};
}
