//! Shared fixtures for the integration tests in this directory: a
//! file-backed sqlite catalog and a ready-to-scan library root, wired up
//! the same way the (unimplemented) HTTP server would wire them at
//! startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use curio_core::catalog::SqliteCatalog;
use curio_core::hashing::XxHashContentHasher;
use curio_core::identity::PlatformFileIdentityResolver;
use curio_core::ingestion::PostIngestionPipeline;
use curio_core::media_source::LocalFsMediaSource;
use curio_core::sync::LibrarySyncProcessor;
use curio_model::prelude::Library;
use tempfile::TempDir;

/// One file-backed sqlite database per test, migrated and ready.
pub async fn new_catalog(tmp: &TempDir) -> Arc<SqliteCatalog> {
    let db_path = tmp.path().join("catalog.sqlite3");
    let url = format!("sqlite://{}", db_path.display());
    Arc::new(SqliteCatalog::connect(&url).await.expect("catalog connects"))
}

pub fn make_library(name: &str, root: &Path) -> Library {
    Library {
        id: curio_model::ids::LibraryId::new(),
        name: name.to_string(),
        root_path: root.to_string_lossy().to_string(),
        scan_interval_hours: 6,
    }
}

pub async fn write_file(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.unwrap();
    }
    tokio::fs::write(&path, contents).await.unwrap();
    path
}

/// A real processor over a real (temp) catalog, media source, hasher, and
/// identity resolver — the only test double anywhere in this stack would
/// be the media backend, which these sync tests never touch.
pub fn make_processor(
    catalog: &Arc<SqliteCatalog>,
    ingestion: Arc<PostIngestionPipeline>,
) -> LibrarySyncProcessor {
    LibrarySyncProcessor::new(
        catalog.posts(),
        catalog.duplicates(),
        catalog.libraries(),
        Arc::new(LocalFsMediaSource::new()),
        Arc::new(PlatformFileIdentityResolver::default()),
        Arc::new(XxHashContentHasher::default()),
        ingestion,
        4,
    )
}
