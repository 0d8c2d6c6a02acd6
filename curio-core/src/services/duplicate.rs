//! Read-only duplicate/excluded-file listings consumed by the
//! (unimplemented) HTTP layer; resolution operations themselves live in
//! [`crate::duplicates::DuplicateResolutionService`]. See `spec.md` §6, §4.8.

use std::sync::Arc;

use curio_contracts::error::{CoreError, Result};
use curio_model::ids::{DuplicateGroupId, LibraryId};
use curio_model::prelude::ExcludedFile;

use crate::catalog::ports::{DuplicateGroupWithEntries, DuplicateRepository};

pub struct DuplicateQueryService {
    duplicates: Arc<dyn DuplicateRepository>,
}

impl DuplicateQueryService {
    pub fn new(duplicates: Arc<dyn DuplicateRepository>) -> Self {
        Self { duplicates }
    }

    pub async fn list_unresolved(&self) -> Result<Vec<DuplicateGroupWithEntries>> {
        self.duplicates.list_unresolved_groups().await
    }

    pub async fn get(&self, id: DuplicateGroupId) -> Result<DuplicateGroupWithEntries> {
        self.duplicates
            .get_group(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("duplicate group {id}")))
    }

    pub async fn list_excluded_files(&self, library_id: LibraryId) -> Result<Vec<ExcludedFile>> {
        self.duplicates.list_excluded_files(library_id).await
    }
}
