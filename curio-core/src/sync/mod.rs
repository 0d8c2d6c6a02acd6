//! Library synchronization: reconciles the catalog with what's actually on
//! disk. See `spec.md` §4.7.

mod path;
mod processor;

pub use path::{is_within_prefix, normalize_relative_path};
pub use processor::{LibrarySyncProcessor, ScanProgressSink, ScanResult};
