//! The named, single-instance-per-key background-work runtime. See
//! `spec.md` §4.9.

pub mod enrichment;
mod find_duplicates;
mod job;
mod key;
mod reporter;
mod scan_all_libraries;
mod service;

pub use find_duplicates::FindDuplicatesJob;
pub use job::{Job, JobContext, JobMode};
pub use key::{
    JobKey, CLEAN_ORPHANED_THUMBNAILS, COMPUTE_PERCEPTUAL_HASHES, EXTRACT_METADATA,
    FIND_DUPLICATES, GENERATE_THUMBNAILS, SCAN_ALL_LIBRARIES,
};
pub use reporter::{JobReporter, ReporterSnapshot};
pub use scan_all_libraries::ScanAllLibrariesJob;
pub use service::{JobService, LiveJobInfo};
