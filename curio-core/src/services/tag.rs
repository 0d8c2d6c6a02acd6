//! Tag and tag-category facade consumed by the (unimplemented) HTTP
//! layer's tag editor. See `spec.md` §6.

use std::sync::Arc;

use curio_contracts::error::{CoreError, Result};
use curio_model::ids::{TagCategoryId, TagId};
use curio_model::prelude::{Tag, TagCategory};

use crate::catalog::ports::TagRepository;

/// Thin wrapper over [`TagRepository`]; the one piece of real logic it
/// adds beyond pass-through CRUD is input validation ahead of the
/// catalog's uniqueness constraints, per `spec.md` §7's `InvalidInput`
/// kind (empty name is never retried, always surfaced directly).
pub struct TagService {
    tags: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(tags: Arc<dyn TagRepository>) -> Self {
        Self { tags }
    }

    pub async fn create_tag(&self, name: &str, category_id: Option<TagCategoryId>) -> Result<TagId> {
        let normalized = normalize_tag_name(name)?;
        self.tags.create_tag(&normalized, category_id).await
    }

    pub async fn get_tag(&self, id: TagId) -> Result<Tag> {
        self.tags
            .get_tag(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("tag {id}")))
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.tags.list_tags().await
    }

    pub async fn delete_tag(&self, id: TagId) -> Result<()> {
        self.tags.delete_tag(id).await
    }

    /// Merges `source` into `target`: moves every post-tag link, deletes
    /// `source`, and has `target` inherit `source`'s category if `target`
    /// has none. Rejects merging a tag into itself.
    pub async fn merge_tags(&self, source: TagId, target: TagId) -> Result<()> {
        if source == target {
            return Err(CoreError::InvalidInput("cannot merge a tag into itself".to_string()));
        }
        self.tags.merge_tags(source, target).await
    }

    pub async fn create_category(&self, name: &str, color: &str, order: i32) -> Result<TagCategoryId> {
        if name.trim().is_empty() {
            return Err(CoreError::InvalidInput("category name must not be empty".to_string()));
        }
        self.tags.create_category(name, color, order).await
    }

    pub async fn list_categories(&self) -> Result<Vec<TagCategory>> {
        self.tags.list_categories().await
    }

    pub async fn delete_category(&self, id: TagCategoryId) -> Result<()> {
        self.tags.delete_category(id).await
    }
}

/// Tag names are stored lowercase (`spec.md` §3); this is the one place
/// user-supplied names cross into the catalog.
fn normalize_tag_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidInput("tag name must not be empty".to_string()));
    }
    Ok(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(normalize_tag_name("  Landscape ").unwrap(), "landscape");
    }

    #[test]
    fn normalize_rejects_empty_name() {
        assert!(normalize_tag_name("   ").is_err());
    }
}
