use chrono::{DateTime, Utc};

use crate::ids::{LibraryId, PostId, TagId};

/// A single indexed media file.
///
/// Key invariants (enforced by the catalog store and the sync processor,
/// not by this type): `(library_id, relative_path)` is unique within a
/// library; `content_hash` is always populated once a post is observable;
/// `(file_identity_device, file_identity_value)` when present is unique
/// within a library; `width`, `height`, and `perceptual_hash` are
/// zero/`None` until enrichment jobs populate them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Post {
    pub id: PostId,
    pub library_id: LibraryId,
    pub relative_path: String,
    pub content_hash: String,
    pub size_bytes: i64,
    pub file_modified_date: DateTime<Utc>,
    pub import_date: DateTime<Utc>,
    pub width: i32,
    pub height: i32,
    pub content_type: String,
    pub perceptual_hash: Option<String>,
    pub is_favorite: bool,
    pub file_identity_device: Option<String>,
    pub file_identity_value: Option<String>,
}

impl Post {
    /// `true` once dimensions and perceptual hash have been filled in by
    /// the enrichment jobs.
    pub fn is_enriched(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// How a post-tag link was created. The same `(post, tag)` pair may exist
/// once per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TagSource {
    Manual,
    Folder,
    AutoTagger,
}

#[cfg(feature = "sqlx")]
impl sqlx::Type<sqlx::Sqlite> for TagSource {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

#[cfg(feature = "sqlx")]
impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TagSource {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.as_str(), buf)
    }
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TagSource {
    fn decode(
        value: sqlx::sqlite::SqliteValueRef<'r>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let raw = <String as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?;
        TagSource::from_str(&raw).ok_or_else(|| format!("unknown tag source {raw:?}").into())
    }
}

impl TagSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagSource::Manual => "manual",
            TagSource::Folder => "folder",
            TagSource::AutoTagger => "auto_tagger",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(TagSource::Manual),
            "folder" => Some(TagSource::Folder),
            "auto_tagger" => Some(TagSource::AutoTagger),
            _ => None,
        }
    }
}

/// A link between a post and a tag, attributed to the source that created
/// it. Multi-valued by source: the same `(post, tag)` may appear at most
/// once per source.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PostTagLink {
    pub post_id: PostId,
    pub tag_id: TagId,
    pub source: TagSource,
}

/// An ordered external URL attached to a post. `url` is unique per post;
/// `order` preserves insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PostSource {
    pub post_id: PostId,
    pub url: String,
    pub order: i32,
}
