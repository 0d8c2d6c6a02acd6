//! Orphaned thumbnail cleanup: any file under `<thumbRoot>` whose
//! `(libraryId, contentHash)` no longer matches a known post is deleted.
//! See `spec.md` §6.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use curio_contracts::error::{CoreError, Result};
use tracing::warn;
use walkdir::WalkDir;

use curio_model::prelude::LibraryId;

use crate::catalog::ports::PostRepository;
use crate::jobs::job::{Job, JobContext, JobMode};
use crate::jobs::key::{JobKey, CLEAN_ORPHANED_THUMBNAILS};

pub struct CleanOrphanedThumbnailsJob {
    posts: Arc<dyn PostRepository>,
    thumbnail_root: PathBuf,
}

impl CleanOrphanedThumbnailsJob {
    pub fn new(posts: Arc<dyn PostRepository>, thumbnail_root: PathBuf) -> Self {
        Self { posts, thumbnail_root }
    }
}

#[async_trait]
impl Job for CleanOrphanedThumbnailsJob {
    fn key(&self) -> JobKey {
        CLEAN_ORPHANED_THUMBNAILS
    }

    fn name(&self) -> &str {
        "Clean orphaned thumbnails"
    }

    fn description(&self) -> &str {
        "Deletes thumbnail files that no longer correspond to a cataloged post."
    }

    fn display_order(&self) -> i32 {
        40
    }

    fn supports_all_mode(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: JobContext) -> Result<()> {
        ctx.reporter.set_activity("Building known-post index...");

        let mut known: HashSet<(LibraryId, String)> = HashSet::new();
        for post in self.posts.list_all().await? {
            known.insert((post.library_id, post.content_hash));
        }

        if ctx.cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        ctx.reporter.set_activity("Scanning thumbnail directory...");
        let root = self.thumbnail_root.clone();
        let orphans = tokio::task::spawn_blocking(move || find_orphans(&root, &known))
            .await
            .map_err(|e| CoreError::Fatal(format!("orphan scan task panicked: {e}")))?;

        let total = orphans.len();
        let mut removed = 0u64;
        for path in orphans {
            if ctx.cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove orphaned thumbnail"),
            }
            ctx.reporter.set_progress(removed as i64, total as i64);
        }

        ctx.reporter.set_activity(format!("Removed {removed} orphaned thumbnails"));
        Ok(())
    }
}

/// Every regular file under `root` whose `<libraryId>/<hash prefix>/<hash prefix>/<hash>.jpg`
/// shape doesn't resolve to a `(library_id, content_hash)` pair in `known`.
fn find_orphans(root: &std::path::Path, known: &HashSet<(LibraryId, String)>) -> Vec<PathBuf> {
    let mut orphans = Vec::new();
    if !root.exists() {
        return orphans;
    }

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(relative) = path.strip_prefix(root).ok() else {
            continue;
        };
        let Some(pair) = library_and_hash(relative) else {
            orphans.push(path.to_path_buf());
            continue;
        };
        if !known.contains(&pair) {
            orphans.push(path.to_path_buf());
        }
    }

    orphans
}

/// Parses `<libraryId>/<hash[0..2]>/<hash[2..4]>/<hash>.jpg` back into
/// `(library_id, content_hash)`. Anything not matching this shape is
/// treated as orphaned too — it can't belong to any known post.
fn library_and_hash(relative: &std::path::Path) -> Option<(LibraryId, String)> {
    let mut components = relative.components();
    let library_component = components.next()?.as_os_str().to_str()?;
    let library_id: LibraryId = library_component.parse::<uuid::Uuid>().ok()?.into();

    let _first_shard = components.next()?;
    let _second_shard = components.next()?;
    let file_component = components.next()?.as_os_str().to_str()?;
    if components.next().is_some() {
        return None;
    }

    let hash = file_component.strip_suffix(".jpg")?;
    Some((library_id, hash.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_sharded_path() {
        let library_id = LibraryId::new();
        let relative = std::path::PathBuf::from(format!("{library_id}/ab/cd/abcd1234.jpg"));
        let (parsed_library, hash) = library_and_hash(&relative).expect("should parse");
        assert_eq!(parsed_library, library_id);
        assert_eq!(hash, "abcd1234");
    }

    #[test]
    fn rejects_malformed_path() {
        let relative = std::path::PathBuf::from("not-a-uuid/ab/cd/abcd1234.jpg");
        assert!(library_and_hash(&relative).is_none());
    }
}
