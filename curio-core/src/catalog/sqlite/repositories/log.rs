use async_trait::async_trait;
use sqlx::SqlitePool;

use curio_contracts::error::Result;
use curio_model::prelude::AppLogEntry;

use crate::catalog::ports::LogRepository;

#[derive(Clone, Debug)]
pub struct SqliteLogRepository {
    pool: SqlitePool,
}

impl SqliteLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogRepository for SqliteLogRepository {
    async fn append(&self, entry: &AppLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO app_log_entries (id, timestamp_utc, level, category, message, exception, properties_json)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id)
        .bind(entry.timestamp_utc)
        .bind(&entry.level)
        .bind(&entry.category)
        .bind(&entry.message)
        .bind(&entry.exception)
        .bind(&entry.properties_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<AppLogEntry>> {
        let entries = sqlx::query_as::<_, AppLogEntry>(
            "SELECT * FROM app_log_entries ORDER BY timestamp_utc DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
