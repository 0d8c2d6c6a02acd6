//! Metadata extraction: fills in `width`/`height` for posts the media
//! backend hasn't looked at yet.

use std::sync::Arc;

use async_trait::async_trait;
use curio_contracts::error::Result;
use curio_contracts::media_backend::MediaBackend;
use futures::StreamExt;
use tracing::warn;

use crate::catalog::ports::{LibraryRepository, PostRepository};
use crate::jobs::job::{Job, JobContext, JobMode};
use crate::jobs::key::{JobKey, EXTRACT_METADATA};

use super::LibraryRootCache;

const BATCH_SIZE: i64 = 100;

pub struct ExtractMetadataJob {
    posts: Arc<dyn PostRepository>,
    libraries: Arc<dyn LibraryRepository>,
    media_backend: Arc<dyn MediaBackend>,
    parallelism: usize,
}

impl ExtractMetadataJob {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        libraries: Arc<dyn LibraryRepository>,
        media_backend: Arc<dyn MediaBackend>,
        parallelism: usize,
    ) -> Self {
        Self {
            posts,
            libraries,
            media_backend,
            parallelism: parallelism.max(1),
        }
    }
}

#[async_trait]
impl Job for ExtractMetadataJob {
    fn key(&self) -> JobKey {
        EXTRACT_METADATA
    }

    fn name(&self) -> &str {
        "Extract metadata"
    }

    fn description(&self) -> &str {
        "Reads width and height for posts missing dimensions."
    }

    fn display_order(&self) -> i32 {
        10
    }

    fn supports_all_mode(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: JobContext) -> Result<()> {
        ctx.reporter.set_activity("Scanning for posts missing metadata...");
        let roots = LibraryRootCache::new(self.libraries.clone());

        let mut processed = 0u64;
        let mut ran_all_pass = false;
        loop {
            if ctx.cancel.is_cancelled() {
                return Err(curio_contracts::error::CoreError::Cancelled);
            }

            let posts = match ctx.mode {
                JobMode::Missing => self.posts.list_missing_dimensions(None, BATCH_SIZE).await?,
                JobMode::All if !ran_all_pass => {
                    ran_all_pass = true;
                    self.posts.list_all().await?
                }
                JobMode::All => Vec::new(),
            };
            if posts.is_empty() {
                break;
            }

            let total = posts.len();
            let repo = self.posts.clone();
            let backend = self.media_backend.clone();
            let permits = tokio::sync::Semaphore::new(self.parallelism);

            futures::stream::iter(posts)
                .for_each_concurrent(None, |post| {
                    let repo = repo.clone();
                    let backend = backend.clone();
                    let permits = &permits;
                    let roots = &roots;
                    async move {
                        let _permit = permits.acquire().await;
                        let path = match roots.full_path(post.library_id, &post.relative_path).await {
                            Ok(p) => p,
                            Err(e) => {
                                warn!(post_id = %post.id, error = %e, "could not resolve library root for post");
                                return;
                            }
                        };
                        match backend.get_metadata(&path).await {
                            Ok(metadata) => {
                                if let Err(e) = repo
                                    .update_enrichment(
                                        post.id,
                                        metadata.width as i32,
                                        metadata.height as i32,
                                        post.perceptual_hash.as_deref(),
                                    )
                                    .await
                                {
                                    warn!(post_id = %post.id, error = %e, "failed to persist metadata");
                                }
                            }
                            Err(e) => {
                                warn!(post_id = %post.id, error = %e, "metadata extraction failed for post");
                            }
                        }
                    }
                })
                .await;

            processed += total as u64;
            ctx.reporter.set_progress(processed as i64, processed as i64);

            if matches!(ctx.mode, JobMode::All) {
                break;
            }
        }

        ctx.reporter.set_activity(format!("Processed {processed} posts"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use curio_contracts::media_backend::{MediaMetadata, MockMediaBackend};
    use curio_model::prelude::{JobExecutionId, Library, LibraryId, Post, PostId};
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

    fn dimensionless_post(library_id: LibraryId, relative_path: &str) -> Post {
        Post {
            id: PostId::new(),
            library_id,
            relative_path: relative_path.to_string(),
            content_hash: "deadbeef".to_string(),
            size_bytes: 123,
            file_modified_date: Utc::now(),
            import_date: Utc::now(),
            width: 0,
            height: 0,
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
                EXTRACT_METADATA.0.to_string(),
                "Extract metadata".to_string(),
                Duration::from_secs(0),
            )),
            cancel: CancellationToken::new(),
            mode,
        }
    }

    #[tokio::test]
    async fn fills_in_dimensions_from_the_media_backend_without_touching_a_real_codec() {
        let tmp = TempDir::new().unwrap();
        let (catalog, library) = catalog_with_library(&tmp).await;
        tokio::fs::write(tmp.path().join("a.jpg"), b"not a real jpeg").await.unwrap();

        let post = dimensionless_post(library.id, "a.jpg");
        catalog.posts().insert_batch(&[post.clone()]).await.unwrap();

        let mut backend = MockMediaBackend::new();
        backend.expect_get_metadata().times(1).returning(|_path| {
            Ok(MediaMetadata {
                width: 1920,
                height: 1080,
                format: "jpeg".to_string(),
                content_type: "image/jpeg".to_string(),
            })
        });

        let job = ExtractMetadataJob::new(
            catalog.posts(),
            catalog.libraries(),
            std::sync::Arc::new(backend),
            2,
        );
        job.execute(context(JobMode::Missing)).await.unwrap();

        let updated = catalog.posts().get_post(post.id).await.unwrap().unwrap();
        assert_eq!(updated.width, 1920);
        assert_eq!(updated.height, 1080);
    }

    #[tokio::test]
    async fn a_post_already_carrying_dimensions_is_never_offered_to_the_backend() {
        let tmp = TempDir::new().unwrap();
        let (catalog, library) = catalog_with_library(&tmp).await;

        let mut post = dimensionless_post(library.id, "a.jpg");
        post.width = 640;
        post.height = 480;
        catalog.posts().insert_batch(&[post]).await.unwrap();

        let mut backend = MockMediaBackend::new();
        backend.expect_get_metadata().times(0);

        let job = ExtractMetadataJob::new(
            catalog.posts(),
            catalog.libraries(),
            std::sync::Arc::new(backend),
            2,
        );
        job.execute(context(JobMode::Missing)).await.unwrap();
    }
}
