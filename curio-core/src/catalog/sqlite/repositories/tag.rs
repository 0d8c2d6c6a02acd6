use async_trait::async_trait;
use sqlx::SqlitePool;

use curio_contracts::error::{CoreError, Result};
use curio_model::prelude::{Tag, TagCategory, TagCategoryId, TagId};

use crate::catalog::ports::TagRepository;

#[derive(Clone, Debug)]
pub struct SqliteTagRepository {
    pool: SqlitePool,
}

impl SqliteTagRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for SqliteTagRepository {
    async fn create_tag(&self, name: &str, tag_category_id: Option<TagCategoryId>) -> Result<TagId> {
        let id = TagId::new();
        let name = name.to_lowercase();
        let result = sqlx::query(
            "INSERT INTO tags (id, name, tag_category_id) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(&name)
        .bind(tag_category_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(id),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(CoreError::Conflict(format!("tag {name:?} already exists")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_tag(&self, id: TagId) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT t.id, t.name, t.tag_category_id, COUNT(l.post_id) as post_count
            FROM tags t LEFT JOIN post_tag_links l ON l.tag_id = t.id
            WHERE t.id = ? GROUP BY t.id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Into::into);
        Ok(tag)
    }

    async fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let name = name.to_lowercase();
        let tag = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT t.id, t.name, t.tag_category_id, COUNT(l.post_id) as post_count
            FROM tags t LEFT JOIN post_tag_links l ON l.tag_id = t.id
            WHERE t.name = ? GROUP BY t.id
            "#,
        )
        .bind(&name)
        .fetch_optional(&self.pool)
        .await?
        .map(Into::into);
        Ok(tag)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT t.id, t.name, t.tag_category_id, COUNT(l.post_id) as post_count
            FROM tags t LEFT JOIN post_tag_links l ON l.tag_id = t.id
            GROUP BY t.id ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
        Ok(tags)
    }

    async fn delete_tag(&self, id: TagId) -> Result<()> {
        sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn merge_tags(&self, source: TagId, target: TagId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let target_category: Option<TagCategoryId> =
            sqlx::query_scalar("SELECT tag_category_id FROM tags WHERE id = ?")
                .bind(target)
                .fetch_one(&mut *tx)
                .await?;

        if target_category.is_none() {
            let source_category: Option<TagCategoryId> =
                sqlx::query_scalar("SELECT tag_category_id FROM tags WHERE id = ?")
                    .bind(source)
                    .fetch_one(&mut *tx)
                    .await?;
            if let Some(category) = source_category {
                sqlx::query("UPDATE tags SET tag_category_id = ? WHERE id = ?")
                    .bind(category)
                    .bind(target)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        // Move links one at a time so `(post_id, tag_id, source)` conflicts
        // with existing target links are silently dropped rather than
        // aborting the whole merge.
        let source_links: Vec<(curio_model::ids::PostId, curio_model::post::TagSource)> =
            sqlx::query_as("SELECT post_id, source FROM post_tag_links WHERE tag_id = ?")
                .bind(source)
                .fetch_all(&mut *tx)
                .await?;

        for (post_id, link_source) in source_links {
            sqlx::query(
                "INSERT OR IGNORE INTO post_tag_links (post_id, tag_id, source) VALUES (?, ?, ?)",
            )
            .bind(post_id)
            .bind(target)
            .bind(link_source.as_str())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(source)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn create_category(&self, name: &str, color: &str, order: i32) -> Result<TagCategoryId> {
        let id = TagCategoryId::new();
        sqlx::query("INSERT INTO tag_categories (id, name, color, \"order\") VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(color)
            .bind(order)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn list_categories(&self) -> Result<Vec<TagCategory>> {
        let categories = sqlx::query_as::<_, TagCategory>(
            "SELECT * FROM tag_categories ORDER BY \"order\"",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn delete_category(&self, id: TagCategoryId) -> Result<()> {
        sqlx::query("DELETE FROM tag_categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct TagRow {
    id: TagId,
    name: String,
    tag_category_id: Option<TagCategoryId>,
    post_count: i64,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            tag_category_id: row.tag_category_id,
            post_count: row.post_count,
        }
    }
}
