use std::fmt;

/// A stable, machine-friendly job identifier, distinct from the human
/// display name surfaced in `Job::name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobKey(pub &'static str);

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const SCAN_ALL_LIBRARIES: JobKey = JobKey("scan-all-libraries");
pub const GENERATE_THUMBNAILS: JobKey = JobKey("generate-thumbnails");
pub const EXTRACT_METADATA: JobKey = JobKey("extract-metadata");
pub const COMPUTE_PERCEPTUAL_HASHES: JobKey = JobKey("compute-perceptual-hashes");
pub const CLEAN_ORPHANED_THUMBNAILS: JobKey = JobKey("clean-orphaned-thumbnails");
pub const FIND_DUPLICATES: JobKey = JobKey("find-duplicates");
