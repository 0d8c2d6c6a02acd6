use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curio_contracts::error::Result;
use curio_model::prelude::{ScheduledJob, ScheduledJobId};

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Inserts a row only if `job_name` is not already present. Used at
    /// startup to seed the default cron table idempotently.
    async fn seed_if_missing(&self, job_name: &str, cron_expression: &str, is_enabled: bool) -> Result<()>;

    async fn get_by_job_name(&self, job_name: &str) -> Result<Option<ScheduledJob>>;
    async fn list_all(&self) -> Result<Vec<ScheduledJob>>;

    /// Schedules enabled and due: `next_run <= now` or `next_run IS NULL`.
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>>;

    async fn record_run(&self, id: ScheduledJobId, last_run: DateTime<Utc>, next_run: DateTime<Utc>) -> Result<()>;
    async fn set_enabled(&self, id: ScheduledJobId, is_enabled: bool) -> Result<()>;
    async fn rename_job(&self, id: ScheduledJobId, job_name: &str) -> Result<()>;
}
