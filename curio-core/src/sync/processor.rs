//! The library synchronization processor: reconciles on-disk state with
//! the catalog. Phases 0-5 exactly as `spec.md` §4.7.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::{DashMap, DashSet};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use curio_contracts::error::{CoreError, Result};
use curio_contracts::hashing::ContentHasher;
use curio_contracts::identity::{FileIdentity, FileIdentityResolver};
use curio_contracts::media_source::MediaSource;
use curio_model::prelude::{Library, Post, PostId, TagSource};

use crate::catalog::ports::{DuplicateRepository, LibraryRepository, PostMove, PostRepository, PostSnapshot, PostUpdate};
use crate::ingestion::PostIngestionPipeline;
use crate::media_source::extensions;

/// Reported by [`LibrarySyncProcessor::process_directory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub scanned: u64,
    pub added: u64,
    pub updated: u64,
    pub moved: u64,
    pub orphaned: u64,
}

/// Progress sink the processor reports through. Defined here (rather than
/// depending on `crate::jobs::JobReporter` directly) so the sync processor
/// has no dependency on the job runtime — jobs adapt their reporter to
/// this trait instead.
pub trait ScanProgressSink: Send + Sync {
    fn set_activity(&self, text: &str);
    fn report_progress(&self, current: u64, total: u64);
}

struct MoveCandidate {
    identity_key: String,
    new_relative_path: String,
    new_content_hash: String,
    new_size_bytes: i64,
    new_file_modified_date: chrono::DateTime<Utc>,
    new_identity: Option<FileIdentity>,
    new_content_type: String,
}

/// Phase-local shared state. Every collection here is monotone /
/// insert-only for the duration of phase 1, so a lock-free map or a
/// mutex-guarded `Vec` is sufficient — no cross-field invariant needs a
/// bigger lock.
struct ScanContext {
    existing_by_path: std::collections::HashMap<String, PostSnapshot>,
    existing_by_identity: std::collections::HashMap<String, Vec<PostSnapshot>>,
    excluded_paths: HashSet<String>,
    ignored_prefixes: Vec<String>,

    seen_paths: DashSet<String>,
    posts_to_update: DashMap<PostId, PostUpdate>,
    potential_moves: Mutex<Vec<MoveCandidate>>,
    added_paths: DashMap<String, String>,

    added: AtomicU64,
    scanned: AtomicU64,
}

/// Reconciles one library root with the catalog: additions, modifications,
/// moves/renames, and orphan removal, with tag inheritance for reintroduced
/// duplicates.
pub struct LibrarySyncProcessor {
    posts: Arc<dyn PostRepository>,
    duplicates: Arc<dyn DuplicateRepository>,
    libraries: Arc<dyn LibraryRepository>,
    media_source: Arc<dyn MediaSource>,
    identity_resolver: Arc<dyn FileIdentityResolver>,
    content_hasher: Arc<dyn ContentHasher>,
    ingestion: Arc<PostIngestionPipeline>,
    scan_parallelism: usize,
}

impl LibrarySyncProcessor {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        duplicates: Arc<dyn DuplicateRepository>,
        libraries: Arc<dyn LibraryRepository>,
        media_source: Arc<dyn MediaSource>,
        identity_resolver: Arc<dyn FileIdentityResolver>,
        content_hasher: Arc<dyn ContentHasher>,
        ingestion: Arc<PostIngestionPipeline>,
        scan_parallelism: usize,
    ) -> Self {
        Self {
            posts,
            duplicates,
            libraries,
            media_source,
            identity_resolver,
            content_hasher,
            ingestion,
            scan_parallelism: scan_parallelism.max(1),
        }
    }

    pub async fn process_directory(
        &self,
        library: &Library,
        directory_path: &Path,
        progress: Option<&dyn ScanProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<ScanResult> {
        if tokio::fs::metadata(directory_path).await.is_err() {
            return Err(CoreError::InvalidInput(format!(
                "library root {} does not exist",
                directory_path.display()
            )));
        }

        if let Some(sink) = progress {
            sink.set_activity("Loading catalog state...");
        }
        let ctx = self.preload(library).await?;

        if let Some(sink) = progress {
            sink.set_activity("Scanning filesystem...");
        }
        let total_hint = self.media_source.count(directory_path).await.unwrap_or(0);
        self.classify_all(library, directory_path, &ctx, progress, total_hint, cancel)
            .await?;

        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        if let Some(sink) = progress {
            sink.set_activity("Resolving moves...");
            sink.report_progress(80, 100);
        }
        let moved = self.resolve_moves(library, &ctx).await?;

        if let Some(sink) = progress {
            sink.set_activity("Applying updates...");
            sink.report_progress(90, 100);
        }
        let updated = self.apply_updates_and_moves(&ctx, &moved).await?;

        if let Some(sink) = progress {
            sink.set_activity("Inheriting tags for reintroduced duplicates...");
        }
        self.ingestion.flush().await?;
        self.inherit_tags(library, &ctx).await?;

        if let Some(sink) = progress {
            sink.set_activity("Removing orphans...");
        }
        let orphaned = self.remove_orphans(&ctx).await?;

        if let Some(sink) = progress {
            sink.set_activity("Completed");
            sink.report_progress(100, 100);
        }

        Ok(ScanResult {
            scanned: ctx.scanned.load(Ordering::Relaxed),
            added: ctx.added.load(Ordering::Relaxed),
            updated,
            moved: moved.len() as u64,
            orphaned,
        })
    }

    async fn preload(&self, library: &Library) -> Result<ScanContext> {
        let snapshots = self.posts.list_snapshot(library.id).await?;

        let mut existing_by_path = std::collections::HashMap::with_capacity(snapshots.len());
        let mut existing_by_identity: std::collections::HashMap<String, Vec<PostSnapshot>> =
            std::collections::HashMap::new();

        for snapshot in snapshots {
            if let Some(identity) = &snapshot.identity {
                existing_by_identity
                    .entry(identity.composite_key())
                    .or_default()
                    .push(snapshot.clone());
            }
            existing_by_path.insert(snapshot.relative_path.clone(), snapshot);
        }

        let excluded_paths: HashSet<String> = self
            .duplicates
            .list_excluded_paths(library.id)
            .await?
            .into_iter()
            .collect();

        let ignored_prefixes: Vec<String> = self
            .libraries
            .list_ignored_paths(library.id)
            .await?
            .into_iter()
            .map(|p| super::path::normalize_relative_path(&p.relative_path_prefix))
            .collect();

        Ok(ScanContext {
            existing_by_path,
            existing_by_identity,
            excluded_paths,
            ignored_prefixes,
            seen_paths: DashSet::new(),
            posts_to_update: DashMap::new(),
            potential_moves: Mutex::new(Vec::new()),
            added_paths: DashMap::new(),
            added: AtomicU64::new(0),
            scanned: AtomicU64::new(0),
        })
    }

    async fn classify_all(
        &self,
        library: &Library,
        directory_path: &Path,
        ctx: &ScanContext,
        progress: Option<&dyn ScanProgressSink>,
        total_hint: u64,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let stream = self.media_source.enumerate(directory_path);
        let processed = AtomicU64::new(0);
        let failure: Mutex<Option<CoreError>> = Mutex::new(None);
        // Bounds actual concurrency to `scan_parallelism`; the stream itself
        // is driven without its own limit so every in-flight item is one
        // that already holds a permit.
        let permits = tokio::sync::Semaphore::new(self.scan_parallelism);

        stream
            .for_each_concurrent(None, |entry| async {
                if cancel.is_cancelled() || failure.lock().is_some() {
                    return;
                }
                let permit = match permits.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                ctx.scanned.fetch_add(1, Ordering::Relaxed);
                if let Err(e) = self.classify_one(library, entry, ctx).await {
                    *failure.lock() = Some(e);
                    drop(permit);
                    return;
                }
                drop(permit);
                let n = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if n % 10 == 0 {
                    if let Some(sink) = progress {
                        let capped_total = total_hint.max(n);
                        sink.report_progress((n * 80) / capped_total.max(1), 100);
                    }
                }
            })
            .await;

        if let Some(e) = failure.into_inner() {
            return Err(e);
        }
        Ok(())
    }

    async fn classify_one(
        &self,
        library: &Library,
        entry: curio_contracts::media_source::MediaSourceEntry,
        ctx: &ScanContext,
    ) -> Result<()> {
        let normalized = super::path::normalize_relative_path(&entry.relative_path);

        if ctx
            .ignored_prefixes
            .iter()
            .any(|prefix| super::path::is_within_prefix(&normalized, prefix))
        {
            return Ok(());
        }
        ctx.seen_paths.insert(normalized.clone());

        if ctx.excluded_paths.contains(&normalized) {
            return Ok(());
        }

        if let Some(existing) = ctx.existing_by_path.get(&normalized) {
            let size_matches = existing.size_bytes == entry.size_bytes as i64;
            let mtime_matches = (existing.file_modified_date - entry.last_modified_utc)
                .num_milliseconds()
                .abs()
                <= 1000;

            if size_matches && mtime_matches {
                if existing.identity.is_some() {
                    return Ok(());
                }
                if let Ok(Some(identity)) = self.identity_resolver.try_resolve(&entry.full_path).await {
                    ctx.posts_to_update.insert(
                        existing.post_id,
                        PostUpdate {
                            post_id: existing.post_id,
                            content_hash: existing.content_hash.clone(),
                            size_bytes: existing.size_bytes,
                            file_modified_date: existing.file_modified_date,
                            identity: Some(identity),
                            hash_changed: false,
                        },
                    );
                }
                return Ok(());
            }

            let new_hash = match self.content_hasher.compute_content_hash(&entry.full_path).await {
                Ok(h) => h,
                Err(e) => {
                    warn!(path = %entry.full_path.display(), error = %e, "skipping file after hash error");
                    return Ok(());
                }
            };
            let identity = self
                .identity_resolver
                .try_resolve(&entry.full_path)
                .await
                .unwrap_or(None);
            let hash_changed = new_hash != existing.content_hash;

            ctx.posts_to_update.insert(
                existing.post_id,
                PostUpdate {
                    post_id: existing.post_id,
                    content_hash: new_hash,
                    size_bytes: entry.size_bytes as i64,
                    file_modified_date: entry.last_modified_utc,
                    identity,
                    hash_changed,
                },
            );
            return Ok(());
        }

        // Not in the catalog: compute identity before deciding new-vs-move.
        let content_hash = match self.content_hasher.compute_content_hash(&entry.full_path).await {
            Ok(h) => h,
            Err(e) => {
                warn!(path = %entry.full_path.display(), error = %e, "skipping file after hash error");
                return Ok(());
            }
        };
        let identity = self
            .identity_resolver
            .try_resolve(&entry.full_path)
            .await
            .unwrap_or(None);
        let extension = Path::new(&normalized)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let content_type = extensions::content_type_for_extension(extension);

        if let Some(identity) = &identity {
            let key = identity.composite_key();
            if ctx
                .existing_by_identity
                .get(&key)
                .map(|v| !v.is_empty())
                .unwrap_or(false)
            {
                ctx.potential_moves.lock().push(MoveCandidate {
                    identity_key: key,
                    new_relative_path: normalized.clone(),
                    new_content_hash: content_hash,
                    new_size_bytes: entry.size_bytes as i64,
                    new_file_modified_date: entry.last_modified_utc,
                    new_identity: Some(identity.clone()),
                    new_content_type: content_type,
                });
                return Ok(());
            }
        }

        let post = Post {
            id: PostId::new(),
            library_id: library.id,
            relative_path: normalized.clone(),
            content_hash: content_hash.clone(),
            size_bytes: entry.size_bytes as i64,
            file_modified_date: entry.last_modified_utc,
            import_date: Utc::now(),
            width: 0,
            height: 0,
            content_type,
            perceptual_hash: None,
            is_favorite: false,
            file_identity_device: identity.as_ref().map(|i| i.device.clone()),
            file_identity_value: identity.as_ref().map(|i| i.value.clone()),
        };
        ctx.added_paths.insert(normalized, content_hash);
        ctx.added.fetch_add(1, Ordering::Relaxed);
        self.ingestion.enqueue(post).await
    }

    /// Phase 2: greedily match move candidates to un-seen existing posts
    /// sharing their identity. Unmatched candidates become true new posts.
    async fn resolve_moves(&self, library: &Library, ctx: &ScanContext) -> Result<Vec<PostMove>> {
        let candidates = std::mem::take(&mut *ctx.potential_moves.lock());
        let mut moved = Vec::new();
        let mut matched_post_ids: HashSet<PostId> = HashSet::new();

        for candidate in candidates {
            let old_match = ctx
                .existing_by_identity
                .get(&candidate.identity_key)
                .and_then(|entries| {
                    entries
                        .iter()
                        .find(|e| !ctx.seen_paths.contains(&e.relative_path) && !matched_post_ids.contains(&e.post_id))
                });

            match old_match {
                Some(old) => {
                    matched_post_ids.insert(old.post_id);
                    ctx.seen_paths.insert(old.relative_path.clone());
                    moved.push(PostMove {
                        post_id: old.post_id,
                        new_relative_path: candidate.new_relative_path,
                        new_content_hash: candidate.new_content_hash,
                        new_size_bytes: candidate.new_size_bytes,
                        new_file_modified_date: candidate.new_file_modified_date,
                        new_identity: candidate.new_identity,
                        new_content_type: candidate.new_content_type,
                    });
                }
                None => {
                    let post = Post {
                        id: PostId::new(),
                        library_id: library.id,
                        relative_path: candidate.new_relative_path.clone(),
                        content_hash: candidate.new_content_hash.clone(),
                        size_bytes: candidate.new_size_bytes,
                        file_modified_date: candidate.new_file_modified_date,
                        import_date: Utc::now(),
                        width: 0,
                        height: 0,
                        content_type: candidate.new_content_type,
                        perceptual_hash: None,
                        is_favorite: false,
                        file_identity_device: candidate.new_identity.as_ref().map(|i| i.device.clone()),
                        file_identity_value: candidate.new_identity.as_ref().map(|i| i.value.clone()),
                    };
                    ctx.added_paths
                        .insert(candidate.new_relative_path, candidate.new_content_hash);
                    ctx.added.fetch_add(1, Ordering::Relaxed);
                    self.ingestion.enqueue(post).await?;
                }
            }
        }

        Ok(moved)
    }

    /// Phase 3: apply every update and move ticket under one scoped session.
    async fn apply_updates_and_moves(&self, ctx: &ScanContext, moves: &[PostMove]) -> Result<u64> {
        let updates: Vec<PostUpdate> = ctx
            .posts_to_update
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        let updated = updates.len() as u64;
        if updates.is_empty() && moves.is_empty() {
            return Ok(0);
        }
        self.posts.apply_updates_and_moves(&updates, moves).await?;
        Ok(updated)
    }

    /// Phase 4: for every newly added path, copy non-`Folder` tag links
    /// from sibling posts sharing the same content hash.
    async fn inherit_tags(&self, library: &Library, ctx: &ScanContext) -> Result<()> {
        for entry in ctx.added_paths.iter() {
            let (new_path, content_hash) = (entry.key().clone(), entry.value().clone());

            let new_post = match self.posts.get_post_by_path(library.id, &new_path).await? {
                Some(p) => p,
                None => continue,
            };

            let siblings = self
                .posts
                .list_posts_by_content_hash(library.id, &content_hash)
                .await?;

            let mut inherited: HashSet<(curio_model::ids::TagId, TagSource)> = HashSet::new();
            for sibling in siblings {
                if sibling.id == new_post.id {
                    continue;
                }
                let links = self.posts.list_tag_links(sibling.id).await?;
                for link in links {
                    if link.source == TagSource::Folder {
                        continue;
                    }
                    if !inherited.insert((link.tag_id, link.source)) {
                        continue;
                    }
                    self.posts
                        .inherit_tag_link(new_post.id, link.tag_id, link.source)
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Phase 5: every preloaded path never marked `seen` is an orphan.
    async fn remove_orphans(&self, ctx: &ScanContext) -> Result<u64> {
        let orphan_ids: Vec<PostId> = ctx
            .existing_by_path
            .values()
            .filter(|snapshot| !ctx.seen_paths.contains(&snapshot.relative_path))
            .map(|snapshot| snapshot.post_id)
            .collect();

        let count = orphan_ids.len() as u64;
        for chunk in orphan_ids.chunks(100) {
            self.posts.delete_batch(chunk).await?;
        }
        Ok(count)
    }
}
