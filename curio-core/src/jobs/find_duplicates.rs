//! Runs the batch [`DuplicateDetector`] pass. The `find-duplicates` entry
//! in [`crate::scheduler::DEFAULT_SCHEDULES`].

use std::sync::Arc;

use async_trait::async_trait;
use curio_contracts::error::Result;

use crate::duplicates::DuplicateDetector;
use crate::jobs::job::{Job, JobContext};
use crate::jobs::key::{JobKey, FIND_DUPLICATES};

const RESULT_SCHEMA_VERSION: i32 = 1;

pub struct FindDuplicatesJob {
    detector: Arc<DuplicateDetector>,
}

impl FindDuplicatesJob {
    pub fn new(detector: Arc<DuplicateDetector>) -> Self {
        Self { detector }
    }
}

#[async_trait]
impl Job for FindDuplicatesJob {
    fn key(&self) -> JobKey {
        FIND_DUPLICATES
    }

    fn name(&self) -> &str {
        "Find duplicates"
    }

    fn description(&self) -> &str {
        "Groups posts by exact content-hash collision and perceptual-hash similarity."
    }

    fn display_order(&self) -> i32 {
        50
    }

    fn supports_all_mode(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: JobContext) -> Result<()> {
        ctx.reporter.set_activity("Grouping posts by exact content hash and perceptual similarity...");

        let summary = self.detector.run().await?;

        let result_json = serde_json::json!({
            "exactGroupsCreated": summary.exact_groups_created,
            "perceptualGroupsCreated": summary.perceptual_groups_created,
        })
        .to_string();
        ctx.reporter.set_result(RESULT_SCHEMA_VERSION, result_json);

        ctx.reporter.set_final_text(format!(
            "Found {} exact duplicate groups and {} perceptual duplicate groups.",
            summary.exact_groups_created, summary.perceptual_groups_created
        ));

        Ok(())
    }
}
