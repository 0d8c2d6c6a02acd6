use async_trait::async_trait;
use curio_contracts::error::Result;
use curio_model::prelude::{DuplicateGroup, DuplicateGroupId, DuplicateGroupType, ExcludedFile, ExcludedFileId, PostId};
use curio_model::ids::LibraryId;

/// A duplicate group together with the post ids it currently contains.
/// The detector and resolution operations both need entries alongside the
/// group row itself, so repository reads return them together rather than
/// forcing a second round-trip.
#[derive(Debug, Clone)]
pub struct DuplicateGroupWithEntries {
    pub group: DuplicateGroup,
    pub post_ids: Vec<PostId>,
}

#[async_trait]
pub trait DuplicateRepository: Send + Sync {
    async fn create_group(
        &self,
        group_type: DuplicateGroupType,
        similarity_percent: Option<i32>,
        post_ids: &[PostId],
    ) -> Result<DuplicateGroupId>;

    async fn get_group(&self, id: DuplicateGroupId) -> Result<Option<DuplicateGroupWithEntries>>;
    async fn list_unresolved_groups(&self) -> Result<Vec<DuplicateGroupWithEntries>>;
    async fn list_unresolved_groups_by_type(
        &self,
        group_type: DuplicateGroupType,
    ) -> Result<Vec<DuplicateGroupWithEntries>>;

    async fn mark_resolved(&self, id: DuplicateGroupId) -> Result<()>;
    async fn unresolve(&self, id: DuplicateGroupId) -> Result<()>;
    async fn delete_group(&self, id: DuplicateGroupId) -> Result<()>;

    /// Removes one entry from a group. Returns the remaining entry count so
    /// the caller can decide whether to auto-resolve.
    async fn remove_entry(&self, group_id: DuplicateGroupId, post_id: PostId) -> Result<usize>;

    async fn add_excluded_file(
        &self,
        library_id: LibraryId,
        relative_path: &str,
        content_hash: &str,
        reason: &str,
    ) -> Result<ExcludedFileId>;
    async fn is_excluded(&self, library_id: LibraryId, relative_path: &str) -> Result<bool>;
    async fn list_excluded_files(&self, library_id: LibraryId) -> Result<Vec<ExcludedFile>>;
    async fn list_excluded_paths(&self, library_id: LibraryId) -> Result<Vec<String>>;
}
