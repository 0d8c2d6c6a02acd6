//! Single-instance-per-key job dispatch against a real catalog-backed
//! execution history.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use curio_contracts::error::Result;
use curio_core::jobs::{Job, JobContext, JobKey, JobMode, JobService};
use support::new_catalog;
use tempfile::TempDir;

const SLOW_JOB: JobKey = JobKey("test-slow-job");

struct SlowJob {
    starts: Arc<AtomicUsize>,
}

#[async_trait]
impl Job for SlowJob {
    fn key(&self) -> JobKey {
        SLOW_JOB
    }
    fn name(&self) -> &str {
        "Slow test job"
    }
    fn description(&self) -> &str {
        "sleeps briefly so concurrent starts race against the same key"
    }
    fn display_order(&self) -> i32 {
        0
    }
    fn supports_all_mode(&self) -> bool {
        false
    }
    async fn execute(&self, _ctx: JobContext) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(())
    }
}

#[tokio::test]
async fn starting_the_same_job_key_twice_concurrently_only_admits_one() {
    let tmp = TempDir::new().unwrap();
    let catalog = new_catalog(&tmp).await;

    let service = JobService::new(catalog.jobs(), Duration::from_secs(3600));
    let starts = Arc::new(AtomicUsize::new(0));
    service.register(Arc::new(SlowJob { starts: starts.clone() }));

    let first = service.start_job(SLOW_JOB, JobMode::Missing).await;
    let second = service.start_job(SLOW_JOB, JobMode::Missing).await;

    assert!(first.is_ok());
    assert!(matches!(second, Err(curio_contracts::error::CoreError::Conflict(_))));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(starts.load(Ordering::SeqCst), 1);

    // Once the first run has completed, the key is free again.
    let third = service.start_job(SLOW_JOB, JobMode::Missing).await;
    assert!(third.is_ok());
}

#[tokio::test]
async fn requesting_all_mode_on_an_unsupporting_job_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let catalog = new_catalog(&tmp).await;

    let service = JobService::new(catalog.jobs(), Duration::from_secs(3600));
    service.register(Arc::new(SlowJob {
        starts: Arc::new(AtomicUsize::new(0)),
    }));

    let result = service.start_job(SLOW_JOB, JobMode::All).await;
    assert!(matches!(result, Err(curio_contracts::error::CoreError::InvalidInput(_))));
}

#[tokio::test]
async fn starting_an_unregistered_key_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let catalog = new_catalog(&tmp).await;
    let service = JobService::new(catalog.jobs(), Duration::from_secs(3600));

    let result = service.start_job(JobKey("never-registered"), JobMode::Missing).await;
    assert!(matches!(result, Err(curio_contracts::error::CoreError::NotFound(_))));
}
