use std::os::unix::fs::MetadataExt;
use std::path::Path;

use async_trait::async_trait;
use curio_contracts::error::Result;
use curio_contracts::identity::{FileIdentity, FileIdentityResolver};

/// Resolves `(st_dev, st_ino)` as the stable identity pair.
#[derive(Debug, Clone, Default)]
pub struct UnixFileIdentityResolver;

#[async_trait]
impl FileIdentityResolver for UnixFileIdentityResolver {
    async fn try_resolve(&self, full_path: &Path) -> Result<Option<FileIdentity>> {
        let path = full_path.to_path_buf();
        let metadata = tokio::task::spawn_blocking(move || std::fs::metadata(&path))
            .await
            .map_err(|e| curio_contracts::error::CoreError::Fatal(e.to_string()))??;

        Ok(Some(FileIdentity {
            device: metadata.dev().to_string(),
            value: metadata.ino().to_string(),
        }))
    }
}
