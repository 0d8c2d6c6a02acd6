//! Small, independent enrichment jobs, each consuming the Media Backend
//! and the catalog. See `spec.md` Purpose & Scope and §4.9.

mod metadata;
mod orphan_cleanup;
mod perceptual_hash;
mod thumbnails;

pub use metadata::ExtractMetadataJob;
pub use orphan_cleanup::CleanOrphanedThumbnailsJob;
pub use perceptual_hash::ComputePerceptualHashesJob;
pub use thumbnails::GenerateThumbnailsJob;

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;

use curio_contracts::error::{CoreError, Result};
use curio_model::ids::LibraryId;

use crate::catalog::ports::LibraryRepository;

/// Caches `library_id -> root_path` lookups for the duration of one job
/// run; every enrichment job resolves full filesystem paths through this
/// rather than repeating a library fetch per post.
pub(crate) struct LibraryRootCache {
    libraries: Arc<dyn LibraryRepository>,
    roots: DashMap<LibraryId, String>,
}

impl LibraryRootCache {
    pub(crate) fn new(libraries: Arc<dyn LibraryRepository>) -> Self {
        Self {
            libraries,
            roots: DashMap::new(),
        }
    }

    pub(crate) async fn full_path(&self, library_id: LibraryId, relative_path: &str) -> Result<PathBuf> {
        if let Some(root) = self.roots.get(&library_id) {
            return Ok(PathBuf::from(root.value()).join(relative_path));
        }
        let library = self
            .libraries
            .get_library(library_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("library {library_id}")))?;
        self.roots.insert(library_id, library.root_path.clone());
        Ok(PathBuf::from(library.root_path).join(relative_path))
    }
}
