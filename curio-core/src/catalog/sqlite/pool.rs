use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use curio_contracts::error::Result;

/// Opens a pool against `database_url` (e.g. `sqlite://curio.db` or
/// `sqlite::memory:`) and runs the embedded migrations.
///
/// Foreign keys are off by default in sqlite; every connection this pool
/// hands out turns them on explicitly so the `ON DELETE CASCADE` clauses in
/// the schema actually take effect.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| curio_contracts::error::CoreError::Fatal(e.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await.map_err(|e| {
        curio_contracts::error::CoreError::Fatal(format!("migration failed: {e}"))
    })?;

    Ok(pool)
}

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
