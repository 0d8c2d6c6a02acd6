//! The batch duplicate detector: exact-hash grouping plus perceptual-hash
//! clustering. See `spec.md` §4.8.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use curio_contracts::error::Result;
use curio_model::prelude::{DuplicateGroupType, Post, PostId};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::catalog::ports::{DuplicateRepository, PostRepository};

use super::union_find::UnionFind;

/// One pairwise image kept only for the bucketed clustering pass — deliberately
/// smaller than `Post` so the CPU-bound comparison stage has nothing to
/// clone but what it needs.
#[derive(Clone)]
struct HashedPost {
    id: PostId,
    perceptual_hash: [u8; 32],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionSummary {
    pub exact_groups_created: u64,
    pub perceptual_groups_created: u64,
}

/// Runs the exact and perceptual duplicate passes over the whole catalog.
///
/// Stateless between runs: every invocation re-derives groups from the
/// current post set, skipping posts in an `ExcludedFile` and never
/// revisiting a resolved group.
pub struct DuplicateDetector {
    posts: Arc<dyn PostRepository>,
    duplicates: Arc<dyn DuplicateRepository>,
    hamming_threshold: u32,
}

impl DuplicateDetector {
    pub fn new(posts: Arc<dyn PostRepository>, duplicates: Arc<dyn DuplicateRepository>, hamming_threshold: u32) -> Self {
        Self {
            posts,
            duplicates,
            hamming_threshold,
        }
    }

    pub async fn run(&self) -> Result<DetectionSummary> {
        let all_posts = self.posts.list_all().await?;
        let candidates = self.filter_excluded(all_posts).await?;

        let existing_exact_sets = self.existing_group_post_sets(DuplicateGroupType::Exact).await?;
        let exact_groups_created = self.run_exact_pass(&candidates, &existing_exact_sets).await?;

        // Posts may now belong to a freshly created exact group too, so the
        // perceptual pass reloads unresolved exact groups after the exact
        // pass has run.
        let existing_exact_sets_after = self.existing_group_post_sets(DuplicateGroupType::Exact).await?;
        let perceptual_groups_created = self
            .run_perceptual_pass(&candidates, &existing_exact_sets_after)
            .await?;

        Ok(DetectionSummary {
            exact_groups_created,
            perceptual_groups_created,
        })
    }

    async fn filter_excluded(&self, posts: Vec<Post>) -> Result<Vec<Post>> {
        let mut excluded_by_library: HashMap<curio_model::ids::LibraryId, HashSet<String>> = HashMap::new();
        let mut kept = Vec::with_capacity(posts.len());

        for post in posts {
            let excluded = match excluded_by_library.get(&post.library_id) {
                Some(set) => set,
                None => {
                    let paths: HashSet<String> = self
                        .duplicates
                        .list_excluded_paths(post.library_id)
                        .await?
                        .into_iter()
                        .collect();
                    excluded_by_library.entry(post.library_id).or_insert(paths);
                    excluded_by_library.get(&post.library_id).unwrap()
                }
            };
            if !excluded.contains(&post.relative_path) {
                kept.push(post);
            }
        }
        Ok(kept)
    }

    async fn existing_group_post_sets(&self, group_type: DuplicateGroupType) -> Result<Vec<HashSet<PostId>>> {
        let groups = self.duplicates.list_unresolved_groups_by_type(group_type).await?;
        Ok(groups
            .into_iter()
            .map(|g| g.post_ids.into_iter().collect())
            .collect())
    }

    async fn run_exact_pass(&self, posts: &[Post], existing: &[HashSet<PostId>]) -> Result<u64> {
        let mut by_hash: HashMap<&str, Vec<PostId>> = HashMap::new();
        for post in posts {
            if post.content_hash.is_empty() {
                continue;
            }
            by_hash.entry(post.content_hash.as_str()).or_default().push(post.id);
        }

        let mut created = 0u64;
        for ids in by_hash.into_values() {
            if ids.len() < 2 {
                continue;
            }
            let id_set: HashSet<PostId> = ids.iter().copied().collect();
            if existing.iter().any(|g| *g == id_set) {
                continue;
            }
            self.duplicates
                .create_group(DuplicateGroupType::Exact, Some(100), &ids)
                .await?;
            created += 1;
        }
        debug!(created, "exact duplicate pass complete");
        Ok(created)
    }

    async fn run_perceptual_pass(&self, posts: &[Post], existing_exact: &[HashSet<PostId>]) -> Result<u64> {
        let hashed: Vec<HashedPost> = posts
            .iter()
            .filter_map(|p| {
                let raw = p.perceptual_hash.as_deref()?;
                let bytes = hex::decode(raw).ok()?;
                let array: [u8; 32] = bytes.try_into().ok()?;
                Some(HashedPost {
                    id: p.id,
                    perceptual_hash: array,
                })
            })
            .collect();

        if hashed.len() < 2 {
            return Ok(0);
        }

        let threshold = self.hamming_threshold;
        let buckets = bucket_by_prefix(&hashed);

        // CPU-bound pairwise comparison; runs on a blocking thread so the
        // async executor isn't starved by a potentially large catalog.
        let components = tokio::task::spawn_blocking(move || cluster_buckets(buckets, threshold))
            .await
            .map_err(|e| curio_contracts::error::CoreError::Fatal(e.to_string()))?;

        let mut created = 0u64;
        for component in components {
            if component.members.len() < 2 {
                continue;
            }
            let member_set: HashSet<PostId> = component.members.iter().map(|m| m.id).collect();
            if existing_exact.iter().any(|g| member_set.is_subset(g)) {
                continue;
            }
            let similarity = (100.0 * (256.0 - component.max_distance as f64) / 256.0).round() as i32;
            let ids: Vec<PostId> = component.members.into_iter().map(|m| m.id).collect();
            self.duplicates
                .create_group(DuplicateGroupType::Perceptual, Some(similarity), &ids)
                .await?;
            created += 1;
        }
        info!(created, "perceptual duplicate pass complete");
        Ok(created)
    }
}

struct Component {
    members: Vec<HashedPost>,
    max_distance: u32,
}

fn bucket_by_prefix(hashed: &[HashedPost]) -> HashMap<u16, Vec<HashedPost>> {
    let mut buckets: HashMap<u16, Vec<HashedPost>> = HashMap::new();
    for post in hashed {
        let prefix = u16::from_be_bytes([post.perceptual_hash[0], post.perceptual_hash[1]]);
        buckets.entry(prefix).or_default().push(post.clone());
    }
    buckets
}

fn cluster_buckets(buckets: HashMap<u16, Vec<HashedPost>>, threshold: u32) -> Vec<Component> {
    buckets
        .into_par_iter()
        .flat_map(|(_, bucket)| cluster_bucket(bucket, threshold))
        .collect()
}

fn cluster_bucket(bucket: Vec<HashedPost>, threshold: u32) -> Vec<Component> {
    let n = bucket.len();
    if n < 2 {
        return Vec::new();
    }

    let mut uf = UnionFind::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let distance = hamming_distance(&bucket[i].perceptual_hash, &bucket[j].perceptual_hash);
            if distance <= threshold {
                uf.union(i, j);
            }
        }
    }

    uf.components()
        .into_iter()
        .filter(|indices| indices.len() >= 2)
        .map(|indices| {
            let members: Vec<HashedPost> = indices.iter().map(|&i| bucket[i].clone()).collect();
            let max_distance = members
                .iter()
                .enumerate()
                .flat_map(|(i, a)| members[i + 1..].iter().map(move |b| (a, b)))
                .map(|(a, b)| hamming_distance(&a.perceptual_hash, &b.perceptual_hash))
                .max()
                .unwrap_or(0);
            Component { members, max_distance }
        })
        .collect()
}

fn hamming_distance(a: &[u8; 32], b: &[u8; 32]) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_distance_zero_for_identical_hashes() {
        let h = [0xAAu8; 32];
        assert_eq!(hamming_distance(&h, &h), 0);
    }

    #[test]
    fn hamming_distance_counts_differing_bits() {
        let a = [0u8; 32];
        let mut b = [0u8; 32];
        b[0] = 0b0000_0011;
        assert_eq!(hamming_distance(&a, &b), 2);
    }

    #[test]
    fn clusters_within_threshold_into_one_component() {
        let mut bucket = Vec::new();
        for i in 0..3u8 {
            let mut h = [0u8; 32];
            h[0] = i;
            bucket.push(HashedPost {
                id: PostId::new(),
                perceptual_hash: h,
            });
        }
        let components = cluster_bucket(bucket, 31);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].members.len(), 3);
    }

    #[test]
    fn does_not_cluster_beyond_threshold() {
        let mut a = HashedPost {
            id: PostId::new(),
            perceptual_hash: [0u8; 32],
        };
        let mut b = a.clone();
        b.perceptual_hash = [0xFFu8; 32];
        a.id = PostId::new();
        let components = cluster_bucket(vec![a, b], 31);
        assert!(components.is_empty());
    }
}
