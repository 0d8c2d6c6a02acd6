//! Post list/detail facade consumed by the (unimplemented) HTTP layer. See
//! `spec.md` §6.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use curio_contracts::error::{CoreError, Result};
use curio_model::ids::{LibraryId, PostId, TagId};
use curio_model::prelude::Post;

use crate::catalog::ports::{PostRepository, TagRepository};
use crate::query::{glob_match, MediaKind, PostQuery, SortDirection, SortField};

/// One page of a post listing, alongside the total match count (pre-page,
/// post-filter) so callers can render pagination controls.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub items: Vec<Post>,
    pub total: usize,
}

/// Thin query/write facade over [`PostRepository`] and [`TagRepository`],
/// applying the grammar from `curio_core::query` in memory. Filtering and
/// sorting happen here rather than in SQL because the dialect is
/// explicitly external to this core (`spec.md` §1) — the catalog store
/// only promises `list_all`.
pub struct PostListService {
    posts: Arc<dyn PostRepository>,
    tags: Arc<dyn TagRepository>,
}

impl PostListService {
    pub fn new(posts: Arc<dyn PostRepository>, tags: Arc<dyn TagRepository>) -> Self {
        Self { posts, tags }
    }

    /// Lists posts matching `query`, optionally scoped to one library,
    /// sorted and paginated per the query's `sort` directive.
    pub async fn list(
        &self,
        query: &PostQuery,
        library_id: Option<LibraryId>,
        offset: usize,
        limit: usize,
    ) -> Result<PostPage> {
        let matched = self.matching_posts(query, library_id).await?;
        let total = matched.len();
        let items = matched.into_iter().skip(offset).take(limit).map(|m| m.post).collect();
        Ok(PostPage { items, total })
    }

    /// Returns the post immediately before and after `post_id` within the
    /// result set `query` would produce, for the HTTP layer's prev/next
    /// navigation.
    pub async fn adjacent(
        &self,
        query: &PostQuery,
        library_id: Option<LibraryId>,
        post_id: PostId,
    ) -> Result<(Option<PostId>, Option<PostId>)> {
        let matched = self.matching_posts(query, library_id).await?;
        let Some(idx) = matched.iter().position(|m| m.post.id == post_id) else {
            return Ok((None, None));
        };
        let previous = idx.checked_sub(1).map(|i| matched[i].post.id);
        let next = matched.get(idx + 1).map(|m| m.post.id);
        Ok((previous, next))
    }

    pub async fn detail(&self, post_id: PostId) -> Result<Post> {
        self.posts
            .get_post(post_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("post {post_id}")))
    }

    async fn matching_posts(&self, query: &PostQuery, library_id: Option<LibraryId>) -> Result<Vec<MatchedPost>> {
        let tag_name_to_id: HashMap<String, TagId> = self
            .tags
            .list_tags()
            .await?
            .into_iter()
            .map(|tag| (tag.name, tag.id))
            .collect();

        let included_tag_ids: Vec<TagId> = query
            .included_tags
            .iter()
            .filter_map(|name| tag_name_to_id.get(name))
            .copied()
            .collect();
        let excluded_tag_ids: Vec<TagId> = query
            .excluded_tags
            .iter()
            .filter_map(|name| tag_name_to_id.get(name))
            .copied()
            .collect();

        // An included tag with no matching name can never be satisfied.
        if query.included_tags.len() > included_tag_ids.len() {
            return Ok(Vec::new());
        }

        let all_posts = self.posts.list_all().await?;
        let mut matched = Vec::with_capacity(all_posts.len());

        for post in all_posts {
            if let Some(library_id) = library_id {
                if post.library_id != library_id {
                    continue;
                }
            }

            let links = self.posts.list_tag_links(post.id).await?;
            let tag_ids: HashSet<TagId> = links.iter().map(|link| link.tag_id).collect();
            let tag_count = tag_ids.len() as i64;

            if !included_tag_ids.iter().all(|id| tag_ids.contains(id)) {
                continue;
            }
            if excluded_tag_ids.iter().any(|id| tag_ids.contains(id)) {
                continue;
            }
            if let Some(filter) = query.tag_count {
                if !filter.matches(tag_count) {
                    continue;
                }
            }
            if let Some(favorite) = query.favorite {
                if post.is_favorite != favorite {
                    continue;
                }
            }
            let kind = media_kind_of(&post.content_type);
            if !query.included_types.is_empty() {
                match kind {
                    Some(kind) if query.included_types.contains(&kind) => {}
                    _ => continue,
                }
            }
            if !query.excluded_types.is_empty() {
                if let Some(kind) = kind {
                    if query.excluded_types.contains(&kind) {
                        continue;
                    }
                }
            }
            let filename = filename_of(&post.relative_path);
            if let Some(pattern) = &query.filename_glob {
                if !glob_match(pattern, filename) {
                    continue;
                }
            }
            if let Some(pattern) = &query.excluded_filename_glob {
                if glob_match(pattern, filename) {
                    continue;
                }
            }

            matched.push(MatchedPost { post, tag_count });
        }

        sort_matched(&mut matched, query);
        Ok(matched)
    }
}

struct MatchedPost {
    post: Post,
    tag_count: i64,
}

fn sort_matched(matched: &mut [MatchedPost], query: &PostQuery) {
    matched.sort_by(|a, b| {
        let ordering = match query.sort.field {
            SortField::FileModifiedDate => a.post.file_modified_date.cmp(&b.post.file_modified_date),
            SortField::ImportDate => a.post.import_date.cmp(&b.post.import_date),
            SortField::TagCount => a.tag_count.cmp(&b.tag_count),
            SortField::Width => a.post.width.cmp(&b.post.width),
            SortField::Height => a.post.height.cmp(&b.post.height),
            SortField::SizeBytes => a.post.size_bytes.cmp(&b.post.size_bytes),
            SortField::Id => a.post.id.cmp(&b.post.id),
        };
        match query.sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

fn media_kind_of(content_type: &str) -> Option<MediaKind> {
    if content_type == "image/gif" {
        Some(MediaKind::Gif)
    } else if content_type.starts_with("image/") {
        Some(MediaKind::Image)
    } else if content_type.starts_with("video/") {
        Some(MediaKind::Video)
    } else {
        None
    }
}

fn filename_of(relative_path: &str) -> &str {
    relative_path.rsplit('/').next().unwrap_or(relative_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_classifies_gif_separately_from_other_images() {
        assert_eq!(media_kind_of("image/gif"), Some(MediaKind::Gif));
        assert_eq!(media_kind_of("image/png"), Some(MediaKind::Image));
        assert_eq!(media_kind_of("video/mp4"), Some(MediaKind::Video));
        assert_eq!(media_kind_of("application/octet-stream"), None);
    }

    #[test]
    fn filename_of_strips_directory_components() {
        assert_eq!(filename_of("a.png"), "a.png");
        assert_eq!(filename_of("sub/dir/a.png"), "a.png");
    }
}
