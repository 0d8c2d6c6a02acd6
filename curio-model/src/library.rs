use crate::ids::LibraryId;

/// A user-declared root directory the indexer scans.
///
/// Invariant: `root_path` must exist at scan time or the scan aborts with
/// an error — enforced by the sync processor, not by this type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Library {
    pub id: LibraryId,
    pub name: String,
    pub root_path: String,
    pub scan_interval_hours: i64,
}

/// A user-declared relative-path prefix whose subtree is treated as
/// nonexistent by future scans.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LibraryIgnoredPath {
    pub id: crate::ids::LibraryIgnoredPathId,
    pub library_id: LibraryId,
    pub relative_path_prefix: String,
    pub created_date: chrono::DateTime<chrono::Utc>,
}
