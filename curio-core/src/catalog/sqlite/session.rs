use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use curio_contracts::error::Result;
use curio_model::prelude::{Post, PostId, TagId, TagSource};

use crate::catalog::ports::{PostMove, PostUpdate};

/// A scoped read-write session spanning a single transaction.
///
/// Dropping a `CatalogSession` without calling [`CatalogSession::commit`]
/// rolls the transaction back — `sqlx::Transaction` already gives us that
/// for free, so this type only adds the handful of multi-statement
/// operations the sync processor and ingestion pipeline need to run
/// atomically together.
pub struct CatalogSession {
    tx: Transaction<'static, Sqlite>,
}

impl CatalogSession {
    pub async fn begin(pool: &SqlitePool) -> Result<Self> {
        let tx = pool.begin().await?;
        Ok(Self { tx })
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Largest number of posts put in one `INSERT ... VALUES` statement.
    /// 14 bound parameters per row keeps a full chunk comfortably under
    /// sqlite's default `SQLITE_LIMIT_VARIABLE_NUMBER`.
    const INSERT_CHUNK_SIZE: usize = 50;

    /// Batch-insert fully constructed posts as multi-row `INSERT ... VALUES`
    /// statements (chunked, all within this session's transaction) so a
    /// whole batch either lands or doesn't without a round-trip per row.
    pub async fn insert_posts(&mut self, posts: &[Post]) -> Result<()> {
        for chunk in posts.chunks(Self::INSERT_CHUNK_SIZE) {
            let mut builder = sqlx::QueryBuilder::new(
                "INSERT INTO posts (
                    id, library_id, relative_path, content_hash, size_bytes,
                    file_modified_date, import_date, width, height, content_type,
                    perceptual_hash, is_favorite, file_identity_device, file_identity_value
                ) ",
            );
            builder.push_values(chunk, |mut row, post| {
                row.push_bind(post.id)
                    .push_bind(post.library_id)
                    .push_bind(&post.relative_path)
                    .push_bind(&post.content_hash)
                    .push_bind(post.size_bytes)
                    .push_bind(post.file_modified_date)
                    .push_bind(post.import_date)
                    .push_bind(post.width)
                    .push_bind(post.height)
                    .push_bind(&post.content_type)
                    .push_bind(&post.perceptual_hash)
                    .push_bind(post.is_favorite)
                    .push_bind(&post.file_identity_device)
                    .push_bind(&post.file_identity_value);
            });
            builder.build().execute(&mut *self.tx).await?;
        }
        Ok(())
    }

    /// Phase 3 update: hash/size/mtime/identity on an existing post. Resets
    /// enrichment fields when `hash_changed` so enrichment jobs reprocess it.
    pub async fn apply_update(&mut self, update: &PostUpdate) -> Result<()> {
        if update.hash_changed {
            sqlx::query(
                r#"
                UPDATE posts SET
                    content_hash = ?, size_bytes = ?, file_modified_date = ?,
                    file_identity_device = ?, file_identity_value = ?,
                    width = 0, height = 0, perceptual_hash = NULL
                WHERE id = ?
                "#,
            )
            .bind(&update.content_hash)
            .bind(update.size_bytes)
            .bind(update.file_modified_date)
            .bind(update.identity.as_ref().map(|i| i.device.as_str()))
            .bind(update.identity.as_ref().map(|i| i.value.as_str()))
            .bind(update.post_id)
            .execute(&mut *self.tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                UPDATE posts SET
                    content_hash = ?, size_bytes = ?, file_modified_date = ?,
                    file_identity_device = ?, file_identity_value = ?
                WHERE id = ?
                "#,
            )
            .bind(&update.content_hash)
            .bind(update.size_bytes)
            .bind(update.file_modified_date)
            .bind(update.identity.as_ref().map(|i| i.device.as_str()))
            .bind(update.identity.as_ref().map(|i| i.value.as_str()))
            .bind(update.post_id)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    /// Phase 3 move: path, hash, size, mtime, identity, and content type.
    pub async fn apply_move(&mut self, mv: &PostMove) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts SET
                relative_path = ?, content_hash = ?, size_bytes = ?,
                file_modified_date = ?, content_type = ?,
                file_identity_device = ?, file_identity_value = ?
            WHERE id = ?
            "#,
        )
        .bind(&mv.new_relative_path)
        .bind(&mv.new_content_hash)
        .bind(mv.new_size_bytes)
        .bind(mv.new_file_modified_date)
        .bind(&mv.new_content_type)
        .bind(mv.new_identity.as_ref().map(|i| i.device.as_str()))
        .bind(mv.new_identity.as_ref().map(|i| i.value.as_str()))
        .bind(mv.post_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Phase 5 orphan removal. Callers chunk ids into batches of 100.
    pub async fn delete_posts(&mut self, ids: &[PostId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut builder = sqlx::QueryBuilder::new("DELETE FROM posts WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        builder.build().execute(&mut *self.tx).await?;
        Ok(())
    }

    /// Phase 4 tag inheritance: copy one non-`Folder` link onto `target`
    /// unless it already exists there.
    pub async fn inherit_tag_link(
        &mut self,
        target_post: PostId,
        tag_id: TagId,
        source: TagSource,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO post_tag_links (post_id, tag_id, source)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(target_post)
        .bind(tag_id)
        .bind(source.as_str())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub fn now() -> chrono::DateTime<Utc> {
        Utc::now()
    }
}
