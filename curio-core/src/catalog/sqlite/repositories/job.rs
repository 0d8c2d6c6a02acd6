use async_trait::async_trait;
use sqlx::SqlitePool;

use curio_contracts::error::Result;
use curio_model::prelude::{JobExecution, JobExecutionId, JobStatus};

use crate::catalog::ports::JobExecutionRepository;

#[derive(Clone, Debug)]
pub struct SqliteJobExecutionRepository {
    pool: SqlitePool,
}

impl SqliteJobExecutionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobExecutionRepository for SqliteJobExecutionRepository {
    async fn create_execution(&self, execution: &JobExecution) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO job_executions (
                id, job_key, job_name, status, start_time, end_time, error_message,
                activity_text, final_text, progress_current, progress_total,
                result_schema_version, result_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(execution.id)
        .bind(&execution.job_key)
        .bind(&execution.job_name)
        .bind(execution.status.as_str())
        .bind(execution.start_time)
        .bind(execution.end_time)
        .bind(&execution.error_message)
        .bind(&execution.activity_text)
        .bind(&execution.final_text)
        .bind(execution.progress_current)
        .bind(execution.progress_total)
        .bind(execution.result_schema_version)
        .bind(&execution.result_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_execution(&self, execution: &JobExecution) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE job_executions SET
                status = ?, end_time = ?, error_message = ?, activity_text = ?,
                final_text = ?, progress_current = ?, progress_total = ?,
                result_schema_version = ?, result_json = ?
            WHERE id = ?
            "#,
        )
        .bind(execution.status.as_str())
        .bind(execution.end_time)
        .bind(&execution.error_message)
        .bind(&execution.activity_text)
        .bind(&execution.final_text)
        .bind(execution.progress_current)
        .bind(execution.progress_total)
        .bind(execution.result_schema_version)
        .bind(&execution.result_json)
        .bind(execution.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_execution(&self, id: JobExecutionId) -> Result<Option<JobExecution>> {
        let execution = sqlx::query_as::<_, JobExecution>(
            "SELECT * FROM job_executions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(execution)
    }

    async fn list_history(&self, job_key: Option<&str>, offset: i64, limit: i64) -> Result<Vec<JobExecution>> {
        let executions = match job_key {
            Some(job_key) => {
                sqlx::query_as::<_, JobExecution>(
                    "SELECT * FROM job_executions WHERE job_key = ? ORDER BY start_time DESC LIMIT ? OFFSET ?",
                )
                .bind(job_key)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, JobExecution>(
                    "SELECT * FROM job_executions ORDER BY start_time DESC LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(executions)
    }

    async fn set_status(&self, id: JobExecutionId, status: JobStatus) -> Result<()> {
        sqlx::query("UPDATE job_executions SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
