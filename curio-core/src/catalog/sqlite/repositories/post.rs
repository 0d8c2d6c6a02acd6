use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use curio_contracts::error::Result;
use curio_contracts::identity::FileIdentity;
use curio_model::prelude::{LibraryId, Post, PostId, PostSource, PostTagLink, TagId, TagSource};

use crate::catalog::ports::{PostAggregate, PostMove, PostRepository, PostSnapshot, PostUpdate};
use crate::catalog::sqlite::session::CatalogSession;

#[derive(Clone, Debug)]
pub struct SqlitePostRepository {
    pool: SqlitePool,
}

impl SqlitePostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn identity_from_row(device: Option<String>, value: Option<String>) -> Option<FileIdentity> {
        match (device, value) {
            (Some(device), Some(value)) => Some(FileIdentity { device, value }),
            _ => None,
        }
    }
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn insert_batch(&self, posts: &[Post]) -> Result<()> {
        let mut session = CatalogSession::begin(&self.pool).await?;
        session.insert_posts(posts).await?;
        session.commit().await
    }

    async fn get_post(&self, id: PostId) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn get_post_by_path(&self, library_id: LibraryId, relative_path: &str) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts WHERE library_id = ? AND relative_path = ?",
        )
        .bind(library_id)
        .bind(relative_path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn list_posts_by_content_hash(&self, library_id: LibraryId, content_hash: &str) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts WHERE library_id = ? AND content_hash = ?",
        )
        .bind(library_id)
        .bind(content_hash)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn list_snapshot(&self, library_id: LibraryId) -> Result<Vec<PostSnapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT id, relative_path, content_hash, size_bytes, file_modified_date,
                   file_identity_device, file_identity_value
            FROM posts WHERE library_id = ?
            "#,
        )
        .bind(library_id)
        .fetch_all(&self.pool)
        .await?;

        let snapshots = rows
            .into_iter()
            .map(|row| PostSnapshot {
                post_id: row.get("id"),
                relative_path: row.get("relative_path"),
                content_hash: row.get("content_hash"),
                size_bytes: row.get("size_bytes"),
                file_modified_date: row.get("file_modified_date"),
                identity: Self::identity_from_row(
                    row.get("file_identity_device"),
                    row.get("file_identity_value"),
                ),
            })
            .collect();
        Ok(snapshots)
    }

    async fn apply_update(&self, update: &PostUpdate) -> Result<()> {
        let mut session = CatalogSession::begin(&self.pool).await?;
        session.apply_update(update).await?;
        session.commit().await
    }

    async fn apply_move(&self, mv: &PostMove) -> Result<()> {
        let mut session = CatalogSession::begin(&self.pool).await?;
        session.apply_move(mv).await?;
        session.commit().await
    }

    async fn apply_updates_and_moves(&self, updates: &[PostUpdate], moves: &[PostMove]) -> Result<()> {
        let mut session = CatalogSession::begin(&self.pool).await?;
        for update in updates {
            session.apply_update(update).await?;
        }
        for mv in moves {
            session.apply_move(mv).await?;
        }
        session.commit().await
    }

    async fn inherit_tag_link(&self, post_id: PostId, tag_id: TagId, source: TagSource) -> Result<()> {
        let mut session = CatalogSession::begin(&self.pool).await?;
        session.inherit_tag_link(post_id, tag_id, source).await?;
        session.commit().await
    }

    async fn delete_batch(&self, ids: &[PostId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut session = CatalogSession::begin(&self.pool).await?;
        session.delete_posts(ids).await?;
        session.commit().await
    }

    async fn set_favorite(&self, id: PostId, is_favorite: bool) -> Result<()> {
        sqlx::query("UPDATE posts SET is_favorite = ? WHERE id = ?")
            .bind(is_favorite)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_enrichment(
        &self,
        id: PostId,
        width: i32,
        height: i32,
        perceptual_hash: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE posts SET width = ?, height = ?, perceptual_hash = ? WHERE id = ?")
            .bind(width)
            .bind(height)
            .bind(perceptual_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_missing_dimensions(&self, library_id: Option<LibraryId>, limit: i64) -> Result<Vec<Post>> {
        let posts = match library_id {
            Some(library_id) => {
                sqlx::query_as::<_, Post>(
                    "SELECT * FROM posts WHERE library_id = ? AND (width = 0 OR height = 0) LIMIT ?",
                )
                .bind(library_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Post>(
                    "SELECT * FROM posts WHERE width = 0 OR height = 0 LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(posts)
    }

    async fn list_missing_perceptual_hash(&self, library_id: Option<LibraryId>, limit: i64) -> Result<Vec<Post>> {
        let posts = match library_id {
            Some(library_id) => {
                sqlx::query_as::<_, Post>(
                    "SELECT * FROM posts WHERE library_id = ? AND perceptual_hash IS NULL AND content_type LIKE 'image/%' LIMIT ?",
                )
                .bind(library_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Post>(
                    "SELECT * FROM posts WHERE perceptual_hash IS NULL AND content_type LIKE 'image/%' LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(posts)
    }

    async fn list_tag_links(&self, post_id: PostId) -> Result<Vec<PostTagLink>> {
        let links = sqlx::query_as::<_, PostTagLink>(
            "SELECT * FROM post_tag_links WHERE post_id = ?",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    async fn add_tag_link(&self, post_id: PostId, tag_id: TagId, source: TagSource) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO post_tag_links (post_id, tag_id, source) VALUES (?, ?, ?)",
        )
        .bind(post_id)
        .bind(tag_id)
        .bind(source.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(curio_contracts::error::CoreError::Conflict(format!(
                    "tag {tag_id} already linked to post {post_id} via {source:?}"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_tag_link(&self, post_id: PostId, tag_id: TagId, source: TagSource) -> Result<()> {
        sqlx::query("DELETE FROM post_tag_links WHERE post_id = ? AND tag_id = ? AND source = ?")
            .bind(post_id)
            .bind(tag_id)
            .bind(source.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_sources(&self, post_id: PostId) -> Result<Vec<PostSource>> {
        let sources = sqlx::query_as::<_, PostSource>(
            "SELECT * FROM post_sources WHERE post_id = ? ORDER BY \"order\"",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sources)
    }

    async fn add_source(&self, post_id: PostId, url: &str, order: i32) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO post_sources (post_id, url, \"order\") VALUES (?, ?, ?)",
        )
        .bind(post_id)
        .bind(url)
        .bind(order)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn aggregate_for_library(&self, library_id: LibraryId) -> Result<PostAggregate> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count, COALESCE(SUM(size_bytes), 0) as total_size_bytes, MAX(import_date) as max_import_date FROM posts WHERE library_id = ?",
        )
        .bind(library_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(PostAggregate {
            count: row.get("count"),
            total_size_bytes: row.get("total_size_bytes"),
            max_import_date: row.get("max_import_date"),
        })
    }

    async fn list_all(&self) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>("SELECT * FROM posts")
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }
}
