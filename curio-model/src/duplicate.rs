use chrono::{DateTime, Utc};

use crate::ids::{DuplicateGroupId, PostId};

/// The detection method that produced a duplicate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DuplicateGroupType {
    Exact,
    Perceptual,
}

#[cfg(feature = "sqlx")]
impl sqlx::Type<sqlx::Sqlite> for DuplicateGroupType {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

#[cfg(feature = "sqlx")]
impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for DuplicateGroupType {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.as_str(), buf)
    }
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for DuplicateGroupType {
    fn decode(
        value: sqlx::sqlite::SqliteValueRef<'r>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let raw = <String as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?;
        match raw.as_str() {
            "exact" => Ok(DuplicateGroupType::Exact),
            "perceptual" => Ok(DuplicateGroupType::Perceptual),
            other => Err(format!("unknown duplicate group type {other:?}").into()),
        }
    }
}

impl DuplicateGroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateGroupType::Exact => "exact",
            DuplicateGroupType::Perceptual => "perceptual",
        }
    }
}

/// A cluster of posts considered near- or exact-duplicates.
///
/// Invariant: a group has >= 2 entries while unresolved; groups of `Exact`
/// type always carry `similarity_percent = Some(100)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DuplicateGroup {
    pub id: DuplicateGroupId,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "group_type"))]
    pub group_type: DuplicateGroupType,
    pub similarity_percent: Option<i32>,
    pub detected_date: DateTime<Utc>,
    pub is_resolved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DuplicateGroupEntry {
    pub group_id: DuplicateGroupId,
    pub post_id: PostId,
}

/// A `(library, relative_path)` pair the scanner skips unconditionally,
/// most often created as a side effect of duplicate resolution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ExcludedFile {
    pub id: crate::ids::ExcludedFileId,
    pub library_id: crate::ids::LibraryId,
    pub relative_path: String,
    pub content_hash: String,
    pub excluded_date: DateTime<Utc>,
    pub reason: String,
}
