use crate::ids::{TagCategoryId, TagId};

/// A globally unique, lowercase tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub tag_category_id: Option<TagCategoryId>,
    /// Derived — the number of posts currently linked to this tag.
    pub post_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TagCategory {
    pub id: TagCategoryId,
    pub name: String,
    pub color: String,
    pub order: i32,
}
