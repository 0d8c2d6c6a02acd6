use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curio_contracts::error::Result;
use curio_contracts::identity::FileIdentity;
use curio_model::prelude::{LibraryId, Post, PostId, PostSource, PostTagLink, TagId, TagSource};

/// One row of the Phase 0 snapshot the sync processor preloads per library.
///
/// Deliberately thin: the sync processor only ever compares these fields
/// against what it finds on disk, it never mutates this struct in place.
#[derive(Debug, Clone)]
pub struct PostSnapshot {
    pub post_id: PostId,
    pub relative_path: String,
    pub content_hash: String,
    pub size_bytes: i64,
    pub file_modified_date: DateTime<Utc>,
    pub identity: Option<FileIdentity>,
}

/// A Phase 3 update ticket: hash/size/mtime/identity change for an existing post.
#[derive(Debug, Clone)]
pub struct PostUpdate {
    pub post_id: PostId,
    pub content_hash: String,
    pub size_bytes: i64,
    pub file_modified_date: DateTime<Utc>,
    pub identity: Option<FileIdentity>,
    /// When true, enrichment fields (`width`, `height`, `perceptual_hash`) are
    /// reset so enrichment jobs reprocess the post.
    pub hash_changed: bool,
}

/// A Phase 3 move ticket: path change for an existing post, identity-matched.
#[derive(Debug, Clone)]
pub struct PostMove {
    pub post_id: PostId,
    pub new_relative_path: String,
    pub new_content_hash: String,
    pub new_size_bytes: i64,
    pub new_file_modified_date: DateTime<Utc>,
    pub new_identity: Option<FileIdentity>,
    pub new_content_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct PostAggregate {
    pub count: i64,
    pub total_size_bytes: i64,
    pub max_import_date: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a batch of fully-constructed posts in one round-trip. Used by
    /// the ingestion pipeline; never partially applied.
    async fn insert_batch(&self, posts: &[Post]) -> Result<()>;

    async fn get_post(&self, id: PostId) -> Result<Option<Post>>;
    async fn get_post_by_path(&self, library_id: LibraryId, relative_path: &str) -> Result<Option<Post>>;
    async fn list_posts_by_content_hash(&self, library_id: LibraryId, content_hash: &str) -> Result<Vec<Post>>;

    /// Phase 0 snapshot load: every post currently cataloged for a library.
    async fn list_snapshot(&self, library_id: LibraryId) -> Result<Vec<PostSnapshot>>;

    async fn apply_update(&self, update: &PostUpdate) -> Result<()>;
    async fn apply_move(&self, mv: &PostMove) -> Result<()>;

    /// Phase 3 of the sync processor: every update and move for one scan
    /// applied under a single scoped session, per `spec.md` §4.7.
    async fn apply_updates_and_moves(&self, updates: &[PostUpdate], moves: &[PostMove]) -> Result<()>;

    /// Phase 4 tag inheritance: copies a non-`Folder` link onto `post_id`,
    /// silently skipping it if it already exists there.
    async fn inherit_tag_link(&self, post_id: PostId, tag_id: TagId, source: TagSource) -> Result<()>;

    /// Batch delete by id, used for orphan removal (caller chunks by 100).
    async fn delete_batch(&self, ids: &[PostId]) -> Result<()>;

    async fn set_favorite(&self, id: PostId, is_favorite: bool) -> Result<()>;

    /// Enrichment jobs write dimensions/perceptual hash back through this.
    async fn update_enrichment(
        &self,
        id: PostId,
        width: i32,
        height: i32,
        perceptual_hash: Option<&str>,
    ) -> Result<()>;

    async fn list_missing_dimensions(&self, library_id: Option<LibraryId>, limit: i64) -> Result<Vec<Post>>;
    async fn list_missing_perceptual_hash(&self, library_id: Option<LibraryId>, limit: i64) -> Result<Vec<Post>>;

    async fn list_tag_links(&self, post_id: PostId) -> Result<Vec<PostTagLink>>;
    async fn add_tag_link(&self, post_id: PostId, tag_id: TagId, source: TagSource) -> Result<()>;
    async fn remove_tag_link(&self, post_id: PostId, tag_id: TagId, source: TagSource) -> Result<()>;

    async fn list_sources(&self, post_id: PostId) -> Result<Vec<PostSource>>;
    async fn add_source(&self, post_id: PostId, url: &str, order: i32) -> Result<()>;

    async fn aggregate_for_library(&self, library_id: LibraryId) -> Result<PostAggregate>;

    /// For all-posts queries consumed by the post-list facade; filtering and
    /// sorting are applied by the caller (`curio_core::query`).
    async fn list_all(&self) -> Result<Vec<Post>>;
}
