use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use curio_contracts::error::Result;
use curio_model::prelude::{Library, LibraryId, LibraryIgnoredPath, LibraryIgnoredPathId};

use crate::catalog::ports::LibraryRepository;
use crate::sync::normalize_relative_path;

#[derive(Clone, Debug)]
pub struct SqliteLibraryRepository {
    pool: SqlitePool,
}

impl SqliteLibraryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LibraryRepository for SqliteLibraryRepository {
    async fn create_library(&self, library: &Library) -> Result<()> {
        sqlx::query(
            "INSERT INTO libraries (id, name, root_path, scan_interval_hours) VALUES (?, ?, ?, ?)",
        )
        .bind(library.id)
        .bind(&library.name)
        .bind(&library.root_path)
        .bind(library.scan_interval_hours)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_library(&self, id: LibraryId) -> Result<Option<Library>> {
        let library = sqlx::query_as::<_, Library>("SELECT * FROM libraries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(library)
    }

    async fn list_libraries(&self) -> Result<Vec<Library>> {
        let libraries = sqlx::query_as::<_, Library>("SELECT * FROM libraries ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(libraries)
    }

    async fn update_library(&self, library: &Library) -> Result<()> {
        let result = sqlx::query(
            "UPDATE libraries SET name = ?, root_path = ?, scan_interval_hours = ? WHERE id = ?",
        )
        .bind(&library.name)
        .bind(&library.root_path)
        .bind(library.scan_interval_hours)
        .bind(library.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(curio_contracts::error::CoreError::NotFound(format!(
                "library {} not found",
                library.id
            )));
        }
        Ok(())
    }

    async fn delete_library(&self, id: LibraryId) -> Result<()> {
        sqlx::query("DELETE FROM libraries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_ignored_path(
        &self,
        library_id: LibraryId,
        relative_path_prefix: &str,
    ) -> Result<LibraryIgnoredPathId> {
        let id = LibraryIgnoredPathId::new();
        let normalized_prefix = normalize_relative_path(relative_path_prefix);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO library_ignored_paths (id, library_id, relative_path_prefix, created_date) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(library_id)
        .bind(relative_path_prefix)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        // An empty normalized prefix matches nothing (`is_within_prefix`
        // agrees) — skip the delete rather than wiping the whole library.
        if !normalized_prefix.is_empty() {
            let prefix_with_slash = format!("{normalized_prefix}/");
            sqlx::query(
                "DELETE FROM posts WHERE library_id = ? AND (relative_path = ? OR substr(relative_path, 1, length(?)) = ?)",
            )
            .bind(library_id)
            .bind(&normalized_prefix)
            .bind(&prefix_with_slash)
            .bind(&prefix_with_slash)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn list_ignored_paths(&self, library_id: LibraryId) -> Result<Vec<LibraryIgnoredPath>> {
        let paths = sqlx::query_as::<_, LibraryIgnoredPath>(
            "SELECT * FROM library_ignored_paths WHERE library_id = ?",
        )
        .bind(library_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(paths)
    }

    async fn delete_ignored_path(&self, id: LibraryIgnoredPathId) -> Result<()> {
        sqlx::query("DELETE FROM library_ignored_paths WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
