use std::sync::Arc;

use async_trait::async_trait;
use curio_contracts::error::Result;
use tokio_util::sync::CancellationToken;

use super::key::JobKey;
use super::reporter::JobReporter;

/// Requested scope for a job run: reprocess only missing/stale items, or
/// every item regardless of current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMode {
    Missing,
    All,
}

/// Handed to a job's `execute`. Cloning is cheap — both fields are `Arc`s.
#[derive(Clone)]
pub struct JobContext {
    pub reporter: Arc<JobReporter>,
    pub cancel: CancellationToken,
    pub mode: JobMode,
}

/// One registered unit of work. Discovered at process start and kept in
/// the service's registry for the process lifetime.
#[async_trait]
pub trait Job: Send + Sync {
    fn key(&self) -> JobKey;
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn display_order(&self) -> i32;
    fn supports_all_mode(&self) -> bool;

    async fn execute(&self, ctx: JobContext) -> Result<()>;
}
