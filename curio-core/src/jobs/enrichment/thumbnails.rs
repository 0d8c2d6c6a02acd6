//! Thumbnail generation. Paths are derived deterministically from a post's
//! `content_hash`, so "missing" is a filesystem check rather than a catalog
//! column — see `spec.md` §6.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use curio_contracts::error::Result;
use curio_contracts::media_backend::MediaBackend;
use futures::StreamExt;
use tracing::warn;

use curio_model::prelude::LibraryId;

use crate::catalog::ports::{LibraryRepository, PostRepository};
use crate::jobs::job::{Job, JobContext, JobMode};
use crate::jobs::key::{JobKey, GENERATE_THUMBNAILS};

use super::LibraryRootCache;

const MAX_EDGE: u32 = 512;

/// Sharded thumbnail path: `<thumbRoot>/<libraryId>/<hash[0..2]>/<hash[2..4]>/<hash>.jpg`.
pub fn thumbnail_path(thumb_root: &Path, library_id: LibraryId, content_hash: &str) -> PathBuf {
    thumb_root
        .join(library_id.to_string())
        .join(&content_hash[0..2])
        .join(&content_hash[2..4])
        .join(format!("{content_hash}.jpg"))
}

pub struct GenerateThumbnailsJob {
    posts: Arc<dyn PostRepository>,
    libraries: Arc<dyn LibraryRepository>,
    media_backend: Arc<dyn MediaBackend>,
    thumbnail_root: PathBuf,
    parallelism: usize,
}

impl GenerateThumbnailsJob {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        libraries: Arc<dyn LibraryRepository>,
        media_backend: Arc<dyn MediaBackend>,
        thumbnail_root: PathBuf,
        parallelism: usize,
    ) -> Self {
        Self {
            posts,
            libraries,
            media_backend,
            thumbnail_root,
            parallelism: parallelism.max(1),
        }
    }
}

#[async_trait]
impl Job for GenerateThumbnailsJob {
    fn key(&self) -> JobKey {
        GENERATE_THUMBNAILS
    }

    fn name(&self) -> &str {
        "Generate thumbnails"
    }

    fn description(&self) -> &str {
        "Writes a sharded thumbnail file for each post."
    }

    fn display_order(&self) -> i32 {
        30
    }

    fn supports_all_mode(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: JobContext) -> Result<()> {
        ctx.reporter.set_activity("Scanning for posts missing a thumbnail...");
        let roots = LibraryRootCache::new(self.libraries.clone());

        let posts = self.posts.list_all().await?;
        let candidates: Vec<_> = match ctx.mode {
            JobMode::All => posts,
            JobMode::Missing => {
                let mut kept = Vec::with_capacity(posts.len());
                for post in posts {
                    let dst = thumbnail_path(&self.thumbnail_root, post.library_id, &post.content_hash);
                    if tokio::fs::metadata(&dst).await.is_err() {
                        kept.push(post);
                    }
                }
                kept
            }
        };

        if candidates.is_empty() {
            ctx.reporter.set_activity("No thumbnails to generate");
            return Ok(());
        }

        if ctx.cancel.is_cancelled() {
            return Err(curio_contracts::error::CoreError::Cancelled);
        }

        let total = candidates.len();
        let backend = self.media_backend.clone();
        let thumbnail_root = self.thumbnail_root.clone();
        let permits = tokio::sync::Semaphore::new(self.parallelism);
        let processed = std::sync::atomic::AtomicU64::new(0);

        futures::stream::iter(candidates)
            .for_each_concurrent(None, |post| {
                let backend = backend.clone();
                let permits = &permits;
                let roots = &roots;
                let thumbnail_root = &thumbnail_root;
                let processed = &processed;
                let reporter = ctx.reporter.clone();
                async move {
                    let _permit = permits.acquire().await;
                    let src = match roots.full_path(post.library_id, &post.relative_path).await {
                        Ok(p) => p,
                        Err(e) => {
                            warn!(post_id = %post.id, error = %e, "could not resolve library root for post");
                            return;
                        }
                    };
                    let dst = thumbnail_path(thumbnail_root, post.library_id, &post.content_hash);
                    if let Err(e) = backend.generate_thumbnail(&src, &dst, MAX_EDGE).await {
                        warn!(post_id = %post.id, error = %e, "thumbnail generation failed for post");
                    }
                    let n = processed.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
                    reporter.set_progress(n as i64, total as i64);
                }
            })
            .await;

        ctx.reporter.set_activity(format!("Generated {total} thumbnails"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use curio_contracts::media_backend::MockMediaBackend;
    use curio_model::prelude::{JobExecutionId, Library, Post, PostId};
    use mockall::predicate::always;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    use crate::catalog::SqliteCatalog;
    use crate::jobs::JobReporter;

    use super::*;

    async fn catalog_with_library(tmp: &TempDir) -> (std::sync::Arc<SqliteCatalog>, Library) {
        let db_path = tmp.path().join("catalog.sqlite3");
        let catalog = std::sync::Arc::new(
            SqliteCatalog::connect(&format!("sqlite://{}", db_path.display()))
                .await
                .expect("catalog connects"),
        );
        let library = Library {
            id: LibraryId::new(),
            name: "demo".to_string(),
            root_path: tmp.path().to_string_lossy().to_string(),
            scan_interval_hours: 6,
        };
        catalog.libraries().create_library(&library).await.unwrap();
        (catalog, library)
    }

    fn post(library_id: LibraryId, relative_path: &str, hash: &str) -> Post {
        Post {
            id: PostId::new(),
            library_id,
            relative_path: relative_path.to_string(),
            content_hash: hash.to_string(),
            size_bytes: 123,
            file_modified_date: Utc::now(),
            import_date: Utc::now(),
            width: 100,
            height: 100,
            content_type: "image/jpeg".to_string(),
            perceptual_hash: None,
            is_favorite: false,
            file_identity_device: None,
            file_identity_value: None,
        }
    }

    fn context(mode: JobMode) -> JobContext {
        JobContext {
            reporter: std::sync::Arc::new(JobReporter::new(
                JobExecutionId::new(),
                GENERATE_THUMBNAILS.0.to_string(),
                "Generate thumbnails".to_string(),
                Duration::from_secs(0),
            )),
            cancel: CancellationToken::new(),
            mode,
        }
    }

    #[test]
    fn sharded_path_uses_the_first_two_hash_prefixes() {
        let library_id = LibraryId::new();
        let root = PathBuf::from("/thumbs");
        let path = thumbnail_path(&root, library_id, "abcd1234ef");
        assert_eq!(
            path,
            root.join(library_id.to_string()).join("ab").join("cd").join("abcd1234ef.jpg")
        );
    }

    #[tokio::test]
    async fn missing_mode_skips_a_post_whose_thumbnail_file_already_exists() {
        let tmp = TempDir::new().unwrap();
        let (catalog, library) = catalog_with_library(&tmp).await;
        let thumb_root = tmp.path().join("thumbs");

        let already_done = post(library.id, "a.jpg", "aaaa1111");
        let existing_path = thumbnail_path(&thumb_root, library.id, &already_done.content_hash);
        tokio::fs::create_dir_all(existing_path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&existing_path, b"already generated").await.unwrap();
        catalog.posts().insert_batch(&[already_done]).await.unwrap();

        let mut backend = MockMediaBackend::new();
        backend.expect_generate_thumbnail().times(0);

        let job = GenerateThumbnailsJob::new(catalog.posts(), catalog.libraries(), std::sync::Arc::new(backend), thumb_root, 2);
        job.execute(context(JobMode::Missing)).await.unwrap();
    }

    #[tokio::test]
    async fn missing_mode_asks_the_backend_to_write_a_thumbnail_for_a_new_post() {
        let tmp = TempDir::new().unwrap();
        let (catalog, library) = catalog_with_library(&tmp).await;
        tokio::fs::write(tmp.path().join("a.jpg"), b"not a real jpeg").await.unwrap();
        let thumb_root = tmp.path().join("thumbs");

        let new_post = post(library.id, "a.jpg", "bbbb2222");
        catalog.posts().insert_batch(&[new_post]).await.unwrap();

        let mut backend = MockMediaBackend::new();
        backend
            .expect_generate_thumbnail()
            .with(always(), always(), mockall::predicate::eq(512))
            .times(1)
            .returning(|_src, _dst, _max_edge| Ok(()));

        let job = GenerateThumbnailsJob::new(catalog.posts(), catalog.libraries(), std::sync::Arc::new(backend), thumb_root, 2);
        job.execute(context(JobMode::Missing)).await.unwrap();
    }
}
