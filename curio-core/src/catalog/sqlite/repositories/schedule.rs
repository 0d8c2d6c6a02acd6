use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use curio_contracts::error::Result;
use curio_model::prelude::{ScheduledJob, ScheduledJobId};

use crate::catalog::ports::ScheduleRepository;

#[derive(Clone, Debug)]
pub struct SqliteScheduleRepository {
    pool: SqlitePool,
}

impl SqliteScheduleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleRepository for SqliteScheduleRepository {
    async fn seed_if_missing(&self, job_name: &str, cron_expression: &str, is_enabled: bool) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO scheduled_jobs (id, job_name, cron_expression, is_enabled) VALUES (?, ?, ?, ?)",
        )
        .bind(ScheduledJobId::new())
        .bind(job_name)
        .bind(cron_expression)
        .bind(is_enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_job_name(&self, job_name: &str) -> Result<Option<ScheduledJob>> {
        let job = sqlx::query_as::<_, ScheduledJob>(
            "SELECT * FROM scheduled_jobs WHERE job_name = ?",
        )
        .bind(job_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn list_all(&self) -> Result<Vec<ScheduledJob>> {
        let jobs = sqlx::query_as::<_, ScheduledJob>("SELECT * FROM scheduled_jobs")
            .fetch_all(&self.pool)
            .await?;
        Ok(jobs)
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>> {
        let jobs = sqlx::query_as::<_, ScheduledJob>(
            "SELECT * FROM scheduled_jobs WHERE is_enabled = 1 AND (next_run <= ? OR next_run IS NULL)",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    async fn record_run(&self, id: ScheduledJobId, last_run: DateTime<Utc>, next_run: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE scheduled_jobs SET last_run = ?, next_run = ? WHERE id = ?")
            .bind(last_run)
            .bind(next_run)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_enabled(&self, id: ScheduledJobId, is_enabled: bool) -> Result<()> {
        sqlx::query("UPDATE scheduled_jobs SET is_enabled = ? WHERE id = ?")
            .bind(is_enabled)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rename_job(&self, id: ScheduledJobId, job_name: &str) -> Result<()> {
        sqlx::query("UPDATE scheduled_jobs SET job_name = ? WHERE id = ?")
            .bind(job_name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
