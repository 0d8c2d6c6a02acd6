use async_trait::async_trait;
use curio_contracts::error::Result;
use curio_model::prelude::{Library, LibraryId, LibraryIgnoredPath, LibraryIgnoredPathId};

/// Repository port for library management within the catalog bounded context.
///
/// Implementations live in infra adapters (sqlite today) and must not leak
/// infra types into the sync/jobs/duplicates layers.
#[async_trait]
pub trait LibraryRepository: Send + Sync {
    async fn create_library(&self, library: &Library) -> Result<()>;
    async fn get_library(&self, id: LibraryId) -> Result<Option<Library>>;
    async fn list_libraries(&self) -> Result<Vec<Library>>;
    async fn update_library(&self, library: &Library) -> Result<()>;
    async fn delete_library(&self, id: LibraryId) -> Result<()>;

    /// Adds an ignored-path prefix and, in the same transaction, deletes
    /// every post already cataloged in `library_id` whose normalized
    /// relative path lies within it (`spec.md` §3).
    async fn add_ignored_path(
        &self,
        library_id: LibraryId,
        relative_path_prefix: &str,
    ) -> Result<LibraryIgnoredPathId>;
    async fn list_ignored_paths(&self, library_id: LibraryId) -> Result<Vec<LibraryIgnoredPath>>;
    async fn delete_ignored_path(&self, id: LibraryIgnoredPathId) -> Result<()>;
}
