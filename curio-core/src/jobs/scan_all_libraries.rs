//! Scans every registered library through the [`LibrarySyncProcessor`].
//! The `scan-all-libraries` entry in [`crate::scheduler::DEFAULT_SCHEDULES`].

use std::sync::Arc;

use async_trait::async_trait;
use curio_contracts::error::{CoreError, Result};
use tracing::warn;

use crate::catalog::ports::LibraryRepository;
use crate::jobs::job::{Job, JobContext};
use crate::jobs::key::{JobKey, SCAN_ALL_LIBRARIES};
use crate::sync::LibrarySyncProcessor;

pub struct ScanAllLibrariesJob {
    libraries: Arc<dyn LibraryRepository>,
    processor: Arc<LibrarySyncProcessor>,
}

impl ScanAllLibrariesJob {
    pub fn new(libraries: Arc<dyn LibraryRepository>, processor: Arc<LibrarySyncProcessor>) -> Self {
        Self { libraries, processor }
    }
}

#[async_trait]
impl Job for ScanAllLibrariesJob {
    fn key(&self) -> JobKey {
        SCAN_ALL_LIBRARIES
    }

    fn name(&self) -> &str {
        "Scan all libraries"
    }

    fn description(&self) -> &str {
        "Reconciles every registered library's catalog state with what's actually on disk."
    }

    fn display_order(&self) -> i32 {
        0
    }

    fn supports_all_mode(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: JobContext) -> Result<()> {
        let libraries = self.libraries.list_libraries().await?;
        if libraries.is_empty() {
            ctx.reporter.set_activity("No libraries registered");
            return Ok(());
        }

        let mut scanned_total = 0u64;
        let mut added_total = 0u64;
        let mut updated_total = 0u64;
        let mut moved_total = 0u64;
        let mut orphaned_total = 0u64;
        let mut failed = 0u64;

        for (index, library) in libraries.iter().enumerate() {
            if ctx.cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }

            ctx.reporter
                .set_activity(format!("Scanning library {} ({}/{})", library.name, index + 1, libraries.len()));
            ctx.reporter.set_progress(index as i64, libraries.len() as i64);

            let root = std::path::PathBuf::from(&library.root_path);
            match self
                .processor
                .process_directory(library, &root, Some(ctx.reporter.as_ref()), &ctx.cancel)
                .await
            {
                Ok(result) => {
                    scanned_total += result.scanned;
                    added_total += result.added;
                    updated_total += result.updated;
                    moved_total += result.moved;
                    orphaned_total += result.orphaned;
                }
                Err(CoreError::Cancelled) => return Err(CoreError::Cancelled),
                Err(e) => {
                    failed += 1;
                    warn!(library = %library.name, error = %e, "library scan failed, continuing with remaining libraries");
                }
            }
        }

        ctx.reporter.set_progress(libraries.len() as i64, libraries.len() as i64);
        ctx.reporter.set_final_text(format!(
            "Scanned {scanned_total} files across {} libraries: {added_total} added, {updated_total} updated, {moved_total} moved, {orphaned_total} orphaned{}.",
            libraries.len(),
            if failed > 0 { format!(", {failed} libraries failed") } else { String::new() }
        ));

        Ok(())
    }
}
