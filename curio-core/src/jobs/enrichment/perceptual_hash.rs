//! Perceptual hashing: fills in the 256-bit average-hash for image posts.
//! Video posts are never hashed (per the `MediaBackend` contract).

use std::sync::Arc;

use async_trait::async_trait;
use curio_contracts::error::Result;
use curio_contracts::media_backend::MediaBackend;
use futures::StreamExt;
use tracing::warn;

use crate::catalog::ports::{LibraryRepository, PostRepository};
use crate::jobs::job::{Job, JobContext, JobMode};
use crate::jobs::key::{JobKey, COMPUTE_PERCEPTUAL_HASHES};

use super::LibraryRootCache;

const BATCH_SIZE: i64 = 100;

pub struct ComputePerceptualHashesJob {
    posts: Arc<dyn PostRepository>,
    libraries: Arc<dyn LibraryRepository>,
    media_backend: Arc<dyn MediaBackend>,
    parallelism: usize,
}

impl ComputePerceptualHashesJob {
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
impl Job for ComputePerceptualHashesJob {
    fn key(&self) -> JobKey {
        COMPUTE_PERCEPTUAL_HASHES
    }

    fn name(&self) -> &str {
        "Compute perceptual hashes"
    }

    fn description(&self) -> &str {
        "Computes the average-hash perceptual fingerprint for image posts."
    }

    fn display_order(&self) -> i32 {
        20
    }

    fn supports_all_mode(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: JobContext) -> Result<()> {
        ctx.reporter.set_activity("Scanning for images missing a perceptual hash...");
        let roots = LibraryRootCache::new(self.libraries.clone());

        let mut processed = 0u64;
        let mut ran_all_pass = false;
        loop {
            if ctx.cancel.is_cancelled() {
                return Err(curio_contracts::error::CoreError::Cancelled);
            }

            let posts = match ctx.mode {
                JobMode::Missing => self.posts.list_missing_perceptual_hash(None, BATCH_SIZE).await?,
                JobMode::All if !ran_all_pass => {
                    ran_all_pass = true;
                    self.posts
                        .list_all()
                        .await?
                        .into_iter()
                        .filter(|p| p.content_type.starts_with("image/"))
                        .collect()
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
                        match backend.compute_perceptual_hash(&path).await {
                            Ok(hash) => {
                                if let Err(e) = repo
                                    .update_enrichment(post.id, post.width, post.height, Some(hash.as_str()))
                                    .await
                                {
                                    warn!(post_id = %post.id, error = %e, "failed to persist perceptual hash");
                                }
                            }
                            Err(e) => {
                                warn!(post_id = %post.id, error = %e, "perceptual hashing failed for post");
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

        ctx.reporter.set_activity(format!("Processed {processed} images"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use curio_contracts::media_backend::MockMediaBackend;
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

    fn post(library_id: LibraryId, relative_path: &str, content_type: &str) -> Post {
        Post {
            id: PostId::new(),
            library_id,
            relative_path: relative_path.to_string(),
            content_hash: "deadbeef".to_string(),
            size_bytes: 123,
            file_modified_date: Utc::now(),
            import_date: Utc::now(),
            width: 100,
            height: 100,
            content_type: content_type.to_string(),
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
                COMPUTE_PERCEPTUAL_HASHES.0.to_string(),
                "Compute perceptual hashes".to_string(),
                Duration::from_secs(0),
            )),
            cancel: CancellationToken::new(),
            mode,
        }
    }

    #[tokio::test]
    async fn hashes_an_image_post_missing_a_perceptual_hash() {
        let tmp = TempDir::new().unwrap();
        let (catalog, library) = catalog_with_library(&tmp).await;
        tokio::fs::write(tmp.path().join("a.jpg"), b"not a real jpeg").await.unwrap();

        let image_post = post(library.id, "a.jpg", "image/jpeg");
        catalog.posts().insert_batch(&[image_post.clone()]).await.unwrap();

        let mut backend = MockMediaBackend::new();
        backend
            .expect_compute_perceptual_hash()
            .times(1)
            .returning(|_path| Ok("f".repeat(64)));

        let job = ComputePerceptualHashesJob::new(catalog.posts(), catalog.libraries(), std::sync::Arc::new(backend), 2);
        job.execute(context(JobMode::Missing)).await.unwrap();

        let updated = catalog.posts().get_post(image_post.id).await.unwrap().unwrap();
        assert_eq!(updated.perceptual_hash.as_deref(), Some("f".repeat(64).as_str()));
    }

    #[tokio::test]
    async fn a_video_post_is_never_sent_to_the_backend_even_in_all_mode() {
        let tmp = TempDir::new().unwrap();
        let (catalog, library) = catalog_with_library(&tmp).await;

        let video_post = post(library.id, "clip.mp4", "video/mp4");
        catalog.posts().insert_batch(&[video_post]).await.unwrap();

        let mut backend = MockMediaBackend::new();
        backend.expect_compute_perceptual_hash().times(0);

        let job = ComputePerceptualHashesJob::new(catalog.posts(), catalog.libraries(), std::sync::Arc::new(backend), 2);
        job.execute(context(JobMode::All)).await.unwrap();
    }
}
