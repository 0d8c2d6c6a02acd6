use async_trait::async_trait;
use curio_contracts::error::Result;
use curio_model::prelude::{Tag, TagCategory, TagCategoryId, TagId};

#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn create_tag(&self, name: &str, tag_category_id: Option<TagCategoryId>) -> Result<TagId>;
    async fn get_tag(&self, id: TagId) -> Result<Option<Tag>>;
    async fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>>;
    async fn list_tags(&self) -> Result<Vec<Tag>>;
    async fn delete_tag(&self, id: TagId) -> Result<()>;

    /// Moves every post-tag link from `source` to `target`, deletes
    /// `source`, and has `target` inherit `source`'s category when `target`
    /// has none set.
    async fn merge_tags(&self, source: TagId, target: TagId) -> Result<()>;

    async fn create_category(&self, name: &str, color: &str, order: i32) -> Result<TagCategoryId>;
    async fn list_categories(&self) -> Result<Vec<TagCategory>>;
    async fn delete_category(&self, id: TagCategoryId) -> Result<()>;
}
