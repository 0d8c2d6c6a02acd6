//! Exact-duplicate detection and auto-resolution against a real catalog:
//! no filesystem or media source involved, since detection only reasons
//! over already-indexed posts.

mod support;

use chrono::Utc;
use curio_core::duplicates::{DuplicateDetector, DuplicateResolutionService};
use curio_model::prelude::{Post, TagSource};
use support::{make_library, new_catalog};
use tempfile::TempDir;

fn post(library_id: curio_model::ids::LibraryId, path: &str, hash: &str, size: i64) -> Post {
    Post {
        id: curio_model::ids::PostId::new(),
        library_id,
        relative_path: path.to_string(),
        content_hash: hash.to_string(),
        size_bytes: size,
        file_modified_date: Utc::now(),
        import_date: Utc::now(),
        width: 0,
        height: 0,
        content_type: "image/png".to_string(),
        perceptual_hash: None,
        is_favorite: false,
        file_identity_device: None,
        file_identity_value: None,
    }
}

#[tokio::test]
async fn exact_hash_match_forms_one_unresolved_group() {
    let tmp = TempDir::new().unwrap();
    let catalog = new_catalog(&tmp).await;
    catalog.libraries().create_library(&make_library("demo", tmp.path())).await.unwrap();
    let library = catalog.libraries().list_libraries().await.unwrap().remove(0);

    let a = post(library.id, "a.png", "deadbeef", 100);
    let b = post(library.id, "b.png", "deadbeef", 100);
    let c = post(library.id, "c.png", "cafef00d", 50);
    catalog.posts().insert_batch(&[a.clone(), b.clone(), c]).await.unwrap();

    let detector = DuplicateDetector::new(catalog.posts(), catalog.duplicates(), 31);
    let summary = detector.run().await.unwrap();

    assert_eq!(summary.exact_groups_created, 1);
    assert_eq!(summary.perceptual_groups_created, 0);

    let groups = catalog.duplicates().list_unresolved_groups().await.unwrap();
    assert_eq!(groups.len(), 1);
    let mut members: Vec<_> = groups[0].post_ids.clone();
    members.sort_by_key(|id| id.to_string());
    let mut expected = vec![a.id, b.id];
    expected.sort_by_key(|id| id.to_string());
    assert_eq!(members, expected);

    // Re-running detection must not duplicate the group it already created.
    let summary_again = detector.run().await.unwrap();
    assert_eq!(summary_again.exact_groups_created, 0);
}

#[tokio::test]
async fn auto_resolve_keeps_the_larger_file_and_excludes_the_rest() {
    let tmp = TempDir::new().unwrap();
    let catalog = new_catalog(&tmp).await;
    catalog.libraries().create_library(&make_library("demo", tmp.path())).await.unwrap();
    let library = catalog.libraries().list_libraries().await.unwrap().remove(0);

    let small = post(library.id, "small.png", "deadbeef", 100);
    let large = post(library.id, "large.png", "deadbeef", 900);
    catalog
        .posts()
        .insert_batch(&[small.clone(), large.clone()])
        .await
        .unwrap();

    let tag_id = catalog.tags().create_tag("landscape", None).await.unwrap();
    catalog
        .posts()
        .add_tag_link(small.id, tag_id, TagSource::Manual)
        .await
        .unwrap();

    let detector = DuplicateDetector::new(catalog.posts(), catalog.duplicates(), 31);
    detector.run().await.unwrap();
    let group_id = catalog.duplicates().list_unresolved_groups().await.unwrap()[0].group.id;

    let resolver = DuplicateResolutionService::new(catalog.posts(), catalog.duplicates(), catalog.libraries());
    resolver.auto_resolve(group_id).await.unwrap();

    // The survivor is the larger file; the smaller one is gone from the
    // catalog but its manual tag has been inherited by the survivor.
    assert!(catalog.posts().get_post(small.id).await.unwrap().is_none());
    assert!(catalog.posts().get_post(large.id).await.unwrap().is_some());
    let survivor_links = catalog.posts().list_tag_links(large.id).await.unwrap();
    assert!(survivor_links.iter().any(|l| l.tag_id == tag_id));

    let excluded = catalog.duplicates().list_excluded_files(library.id).await.unwrap();
    assert_eq!(excluded.len(), 1);
    assert_eq!(excluded[0].relative_path, "small.png");

    let group = catalog.duplicates().get_group(group_id).await.unwrap().unwrap();
    assert!(group.group.is_resolved);
}
