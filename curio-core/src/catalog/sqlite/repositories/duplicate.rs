use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use curio_contracts::error::Result;
use curio_model::ids::LibraryId;
use curio_model::prelude::{
    DuplicateGroup, DuplicateGroupId, DuplicateGroupType, ExcludedFile, ExcludedFileId, PostId,
};

use crate::catalog::ports::{DuplicateGroupWithEntries, DuplicateRepository};

#[derive(Clone, Debug)]
pub struct SqliteDuplicateRepository {
    pool: SqlitePool,
}

impl SqliteDuplicateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn attach_entries(&self, groups: Vec<DuplicateGroup>) -> Result<Vec<DuplicateGroupWithEntries>> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_group: HashMap<DuplicateGroupId, Vec<PostId>> = HashMap::new();
        let mut builder =
            sqlx::QueryBuilder::new("SELECT group_id, post_id FROM duplicate_group_entries WHERE group_id IN (");
        let mut separated = builder.separated(", ");
        for group in &groups {
            separated.push_bind(group.id);
        }
        separated.push_unseparated(")");

        let rows = builder.build().fetch_all(&self.pool).await?;
        for row in rows {
            let group_id: DuplicateGroupId = row.get("group_id");
            let post_id: PostId = row.get("post_id");
            by_group.entry(group_id).or_default().push(post_id);
        }

        Ok(groups
            .into_iter()
            .map(|group| {
                let post_ids = by_group.remove(&group.id).unwrap_or_default();
                DuplicateGroupWithEntries { group, post_ids }
            })
            .collect())
    }
}

#[async_trait]
impl DuplicateRepository for SqliteDuplicateRepository {
    async fn create_group(
        &self,
        group_type: DuplicateGroupType,
        similarity_percent: Option<i32>,
        post_ids: &[PostId],
    ) -> Result<DuplicateGroupId> {
        let id = DuplicateGroupId::new();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO duplicate_groups (id, group_type, similarity_percent, detected_date, is_resolved) VALUES (?, ?, ?, ?, 0)",
        )
        .bind(id)
        .bind(group_type.as_str())
        .bind(similarity_percent)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        for post_id in post_ids {
            sqlx::query("INSERT INTO duplicate_group_entries (group_id, post_id) VALUES (?, ?)")
                .bind(id)
                .bind(*post_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn get_group(&self, id: DuplicateGroupId) -> Result<Option<DuplicateGroupWithEntries>> {
        let group = sqlx::query_as::<_, DuplicateGroup>("SELECT * FROM duplicate_groups WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match group {
            Some(group) => Ok(self.attach_entries(vec![group]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn list_unresolved_groups(&self) -> Result<Vec<DuplicateGroupWithEntries>> {
        let groups = sqlx::query_as::<_, DuplicateGroup>(
            "SELECT * FROM duplicate_groups WHERE is_resolved = 0",
        )
        .fetch_all(&self.pool)
        .await?;
        self.attach_entries(groups).await
    }

    async fn list_unresolved_groups_by_type(
        &self,
        group_type: DuplicateGroupType,
    ) -> Result<Vec<DuplicateGroupWithEntries>> {
        let groups = sqlx::query_as::<_, DuplicateGroup>(
            "SELECT * FROM duplicate_groups WHERE is_resolved = 0 AND group_type = ?",
        )
        .bind(group_type.as_str())
        .fetch_all(&self.pool)
        .await?;
        self.attach_entries(groups).await
    }

    async fn mark_resolved(&self, id: DuplicateGroupId) -> Result<()> {
        sqlx::query("UPDATE duplicate_groups SET is_resolved = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn unresolve(&self, id: DuplicateGroupId) -> Result<()> {
        sqlx::query("UPDATE duplicate_groups SET is_resolved = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_group(&self, id: DuplicateGroupId) -> Result<()> {
        sqlx::query("DELETE FROM duplicate_groups WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_entry(&self, group_id: DuplicateGroupId, post_id: PostId) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM duplicate_group_entries WHERE group_id = ? AND post_id = ?")
            .bind(group_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM duplicate_group_entries WHERE group_id = ?")
                .bind(group_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(remaining as usize)
    }

    async fn add_excluded_file(
        &self,
        library_id: LibraryId,
        relative_path: &str,
        content_hash: &str,
        reason: &str,
    ) -> Result<ExcludedFileId> {
        let id = ExcludedFileId::new();
        sqlx::query(
            "INSERT INTO excluded_files (id, library_id, relative_path, content_hash, excluded_date, reason) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(library_id)
        .bind(relative_path)
        .bind(content_hash)
        .bind(Utc::now())
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn is_excluded(&self, library_id: LibraryId, relative_path: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM excluded_files WHERE library_id = ? AND relative_path = ?",
        )
        .bind(library_id)
        .bind(relative_path)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn list_excluded_files(&self, library_id: LibraryId) -> Result<Vec<ExcludedFile>> {
        let files = sqlx::query_as::<_, ExcludedFile>(
            "SELECT * FROM excluded_files WHERE library_id = ?",
        )
        .bind(library_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(files)
    }

    async fn list_excluded_paths(&self, library_id: LibraryId) -> Result<Vec<String>> {
        let paths = sqlx::query_scalar(
            "SELECT relative_path FROM excluded_files WHERE library_id = ?",
        )
        .bind(library_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(paths)
    }
}
