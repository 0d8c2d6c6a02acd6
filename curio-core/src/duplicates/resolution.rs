//! Resolution operations over duplicate groups: dismiss, auto-resolve,
//! exclude/delete a single post, unresolve, and the same-folder view. See
//! `spec.md` §4.8.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use curio_contracts::error::{CoreError, Result};
use curio_model::prelude::{DuplicateGroupId, LibraryId, Post, PostId};
use tracing::warn;

use crate::catalog::ports::{DuplicateRepository, LibraryRepository, PostRepository};

const DUPLICATE_RESOLUTION_REASON: &str = "duplicate_resolution";

#[derive(Debug, Clone)]
pub struct SameFolderPartition {
    pub library_id: LibraryId,
    pub folder: String,
    pub post_ids: Vec<PostId>,
    pub recommended_survivor: PostId,
}

/// Facade over the duplicate and post repositories implementing the
/// resolution operations named in `spec.md` §4.8.
pub struct DuplicateResolutionService {
    posts: Arc<dyn PostRepository>,
    duplicates: Arc<dyn DuplicateRepository>,
    libraries: Arc<dyn LibraryRepository>,
}

impl DuplicateResolutionService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        duplicates: Arc<dyn DuplicateRepository>,
        libraries: Arc<dyn LibraryRepository>,
    ) -> Self {
        Self {
            posts,
            duplicates,
            libraries,
        }
    }

    pub async fn dismiss(&self, group_id: DuplicateGroupId) -> Result<()> {
        self.duplicates.mark_resolved(group_id).await
    }

    pub async fn unresolve(&self, group_id: DuplicateGroupId) -> Result<()> {
        self.duplicates.unresolve(group_id).await
    }

    pub async fn auto_resolve(&self, group_id: DuplicateGroupId) -> Result<()> {
        let group = self.get_group_posts(group_id).await?;
        if group.len() < 2 {
            return self.duplicates.mark_resolved(group_id).await;
        }
        let survivor = select_survivor(&group);
        let non_survivors: Vec<PostId> = group.iter().map(|p| p.id).filter(|id| *id != survivor).collect();

        self.merge_into_survivor(survivor, &non_survivors).await?;
        self.exclude_and_delete(&group, &non_survivors, false).await?;
        self.duplicates.mark_resolved(group_id).await
    }

    pub async fn exclude_single_post(&self, group_id: DuplicateGroupId, post_id: PostId) -> Result<()> {
        self.remove_single_post(group_id, post_id, false).await
    }

    pub async fn delete_single_post_on_disk(&self, group_id: DuplicateGroupId, post_id: PostId) -> Result<()> {
        self.remove_single_post(group_id, post_id, true).await
    }

    async fn remove_single_post(&self, group_id: DuplicateGroupId, post_id: PostId, delete_on_disk: bool) -> Result<()> {
        let group = self.get_group_posts(group_id).await?;
        let post = group
            .iter()
            .find(|p| p.id == post_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("post {post_id} is not a member of group {group_id}")))?;

        self.exclude_and_delete(&group, std::slice::from_ref(&post_id), delete_on_disk)
            .await?;

        let remaining = self.duplicates.remove_entry(group_id, post_id).await?;
        if remaining < 2 {
            self.duplicates.mark_resolved(group_id).await?;
        }
        let _ = post;
        Ok(())
    }

    pub async fn same_folder_view(&self, group_id: DuplicateGroupId) -> Result<Vec<SameFolderPartition>> {
        let group = self.get_group_posts(group_id).await?;

        let mut partitions: std::collections::HashMap<(LibraryId, String), Vec<Post>> = std::collections::HashMap::new();
        for post in group {
            let folder = parent_folder(&post.relative_path);
            partitions.entry((post.library_id, folder)).or_default().push(post);
        }

        let mut result = Vec::new();
        for ((library_id, folder), posts) in partitions {
            if posts.len() < 2 {
                continue;
            }
            let survivor = select_survivor(&posts);
            result.push(SameFolderPartition {
                library_id,
                folder,
                post_ids: posts.into_iter().map(|p| p.id).collect(),
                recommended_survivor: survivor,
            });
        }
        Ok(result)
    }

    async fn get_group_posts(&self, group_id: DuplicateGroupId) -> Result<Vec<Post>> {
        let with_entries = self
            .duplicates
            .get_group(group_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("duplicate group {group_id}")))?;

        let mut posts = Vec::with_capacity(with_entries.post_ids.len());
        for post_id in with_entries.post_ids {
            if let Some(post) = self.posts.get_post(post_id).await? {
                posts.push(post);
            }
        }
        Ok(posts)
    }

    async fn merge_into_survivor(&self, survivor: PostId, non_survivors: &[PostId]) -> Result<()> {
        let mut tag_ids_present: HashSet<curio_model::ids::TagId> = self
            .posts
            .list_tag_links(survivor)
            .await?
            .into_iter()
            .map(|link| link.tag_id)
            .collect();

        let existing_sources = self.posts.list_sources(survivor).await?;
        let mut urls_present: HashSet<String> = existing_sources.iter().map(|s| s.url.clone()).collect();
        let mut next_order = existing_sources.iter().map(|s| s.order).max().map(|o| o + 1).unwrap_or(0);

        for &post_id in non_survivors {
            for link in self.posts.list_tag_links(post_id).await? {
                if tag_ids_present.insert(link.tag_id) {
                    self.posts.add_tag_link(survivor, link.tag_id, link.source).await?;
                }
            }
            for source in self.posts.list_sources(post_id).await? {
                if urls_present.insert(source.url.clone()) {
                    self.posts.add_source(survivor, &source.url, next_order).await?;
                    next_order += 1;
                }
            }
        }
        Ok(())
    }

    async fn exclude_and_delete(&self, group: &[Post], to_remove: &[PostId], delete_on_disk: bool) -> Result<()> {
        for post_id in to_remove {
            let post = group
                .iter()
                .find(|p| p.id == *post_id)
                .ok_or_else(|| CoreError::NotFound(format!("post {post_id} missing from group snapshot")))?;

            if !self.duplicates.is_excluded(post.library_id, &post.relative_path).await? {
                self.duplicates
                    .add_excluded_file(post.library_id, &post.relative_path, &post.content_hash, DUPLICATE_RESOLUTION_REASON)
                    .await?;
            }

            if delete_on_disk {
                if let Some(library) = self.libraries.get_library(post.library_id).await? {
                    let full_path = Path::new(&library.root_path).join(&post.relative_path);
                    if let Err(e) = tokio::fs::remove_file(&full_path).await {
                        if e.kind() != std::io::ErrorKind::NotFound {
                            warn!(path = %full_path.display(), error = %e, "failed to delete duplicate file from disk");
                        }
                    }
                }
            }
        }

        self.posts.delete_batch(to_remove).await
    }
}

fn select_survivor(posts: &[Post]) -> PostId {
    posts
        .iter()
        .max_by_key(|p| {
            (
                p.width as i64 * p.height as i64,
                p.size_bytes,
                p.file_modified_date,
                p.id,
            )
        })
        .expect("caller guarantees non-empty group")
        .id
}

fn parent_folder(relative_path: &str) -> String {
    match Path::new(relative_path).parent() {
        Some(parent) => parent.to_string_lossy().replace('\\', "/"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use curio_model::ids::{LibraryId, PostId};

    fn post(id: PostId, width: i32, height: i32, size: i64, path: &str) -> Post {
        Post {
            id,
            library_id: LibraryId::new(),
            relative_path: path.to_string(),
            content_hash: "deadbeef".to_string(),
            size_bytes: size,
            file_modified_date: Utc::now(),
            import_date: Utc::now(),
            width,
            height,
            content_type: "image/png".to_string(),
            perceptual_hash: None,
            is_favorite: false,
            file_identity_device: None,
            file_identity_value: None,
        }
    }

    #[test]
    fn survivor_prefers_higher_resolution() {
        let a = post(PostId::new(), 100, 100, 500, "a.png");
        let b = post(PostId::new(), 200, 200, 100, "b.png");
        assert_eq!(select_survivor(&[a.clone(), b.clone()]), b.id);
    }

    #[test]
    fn survivor_falls_back_to_size_when_resolution_ties() {
        let a = post(PostId::new(), 100, 100, 500, "a.png");
        let b = post(PostId::new(), 100, 100, 900, "b.png");
        assert_eq!(select_survivor(&[a.clone(), b.clone()]), b.id);
    }

    #[test]
    fn parent_folder_of_root_file_is_empty() {
        assert_eq!(parent_folder("a.png"), "");
        assert_eq!(parent_folder("sub/a.png"), "sub");
    }
}
