use async_trait::async_trait;
use curio_contracts::error::Result;
use curio_model::prelude::{JobExecution, JobExecutionId, JobStatus};

#[async_trait]
pub trait JobExecutionRepository: Send + Sync {
    async fn create_execution(&self, execution: &JobExecution) -> Result<()>;

    /// Partial update of the mutable fields a running job's reporter writes.
    /// Called by the job service's periodic persistence loop and once more
    /// on terminal status.
    async fn update_execution(&self, execution: &JobExecution) -> Result<()>;

    async fn get_execution(&self, id: JobExecutionId) -> Result<Option<JobExecution>>;

    /// History page ordered by `start_time` descending.
    async fn list_history(&self, job_key: Option<&str>, offset: i64, limit: i64) -> Result<Vec<JobExecution>>;

    async fn set_status(&self, id: JobExecutionId, status: JobStatus) -> Result<()>;
}
