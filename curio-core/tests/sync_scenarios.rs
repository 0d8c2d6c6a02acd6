//! End-to-end scans against a real filesystem tree and a real sqlite
//! catalog: fresh import, rename, content change, and ignored prefixes.
//!
//! `LibrarySyncProcessor::process_directory` flushes the ingestion
//! pipeline itself before returning, so every assertion here can read the
//! catalog straight back without an extra synchronization step.

mod support;

use std::sync::Arc;
use std::time::Duration;

use curio_core::ingestion::PostIngestionPipeline;
use curio_core::sync::ScanResult;
use support::{make_library, make_processor, new_catalog, write_file};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const A_JPEG: &[u8] = b"not a real jpeg but big enough to hash\0\0\0\0\0\0\0\0";

async fn scan_once(
    catalog: &Arc<curio_core::catalog::SqliteCatalog>,
    library: &curio_model::prelude::Library,
    root: &std::path::Path,
) -> ScanResult {
    let ingestion = Arc::new(PostIngestionPipeline::spawn(catalog.clone(), 16, 4));
    let processor = make_processor(catalog, ingestion.clone());
    let cancel = CancellationToken::new();
    let result = processor
        .process_directory(library, root, None, &cancel)
        .await
        .unwrap();
    drop(processor);
    Arc::try_unwrap(ingestion)
        .ok()
        .expect("processor dropped, ingestion uniquely owned")
        .shutdown()
        .await
        .unwrap();
    result
}

#[tokio::test]
async fn fresh_import_discovers_every_supported_file() {
    let tmp = TempDir::new().unwrap();
    let catalog = new_catalog(&tmp).await;
    catalog.libraries().create_library(&make_library("demo", tmp.path())).await.unwrap();
    let library = catalog.libraries().list_libraries().await.unwrap().remove(0);

    write_file(tmp.path(), "a.jpg", A_JPEG).await;
    write_file(tmp.path(), "clip.mp4", b"fake mp4 bytes padded out a bit more than a block").await;
    write_file(tmp.path(), "notes.txt", b"unsupported extension, should be skipped entirely").await;

    let result = scan_once(&catalog, &library, tmp.path()).await;

    assert_eq!(
        result,
        ScanResult {
            scanned: 2,
            added: 2,
            updated: 0,
            moved: 0,
            orphaned: 0,
        }
    );

    let posts = catalog.posts().list_all().await.unwrap();
    assert_eq!(posts.len(), 2);
    let video = posts.iter().find(|p| p.relative_path == "clip.mp4").unwrap();
    assert_eq!(video.content_type, "video/mp4");
    let image = posts.iter().find(|p| p.relative_path == "a.jpg").unwrap();
    assert_eq!(image.content_type, "image/jpeg");
    assert!(!image.content_hash.is_empty());
}

#[tokio::test]
async fn rescanning_unchanged_tree_adds_nothing() {
    let tmp = TempDir::new().unwrap();
    let catalog = new_catalog(&tmp).await;
    catalog.libraries().create_library(&make_library("demo", tmp.path())).await.unwrap();
    let library = catalog.libraries().list_libraries().await.unwrap().remove(0);
    write_file(tmp.path(), "a.jpg", A_JPEG).await;

    scan_once(&catalog, &library, tmp.path()).await;
    let result = scan_once(&catalog, &library, tmp.path()).await;

    assert_eq!(
        result,
        ScanResult {
            scanned: 1,
            added: 0,
            updated: 0,
            moved: 0,
            orphaned: 0,
        }
    );
}

#[tokio::test]
async fn renaming_a_file_is_seen_as_a_move_not_an_orphan_plus_add() {
    let tmp = TempDir::new().unwrap();
    let catalog = new_catalog(&tmp).await;
    catalog.libraries().create_library(&make_library("demo", tmp.path())).await.unwrap();
    let library = catalog.libraries().list_libraries().await.unwrap().remove(0);
    write_file(tmp.path(), "a.jpg", A_JPEG).await;

    scan_once(&catalog, &library, tmp.path()).await;
    let original_id = catalog.posts().list_all().await.unwrap().remove(0).id;

    tokio::fs::rename(tmp.path().join("a.jpg"), tmp.path().join("renamed.jpg")).await.unwrap();

    let result = scan_once(&catalog, &library, tmp.path()).await;

    assert_eq!(
        result,
        ScanResult {
            scanned: 1,
            added: 0,
            updated: 0,
            moved: 1,
            orphaned: 0,
        }
    );

    let posts = catalog.posts().list_all().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, original_id);
    assert_eq!(posts[0].relative_path, "renamed.jpg");
}

#[tokio::test]
async fn content_change_resets_dimensions_and_perceptual_hash() {
    let tmp = TempDir::new().unwrap();
    let catalog = new_catalog(&tmp).await;
    catalog.libraries().create_library(&make_library("demo", tmp.path())).await.unwrap();
    let library = catalog.libraries().list_libraries().await.unwrap().remove(0);
    write_file(tmp.path(), "a.jpg", A_JPEG).await;

    scan_once(&catalog, &library, tmp.path()).await;

    let post_id = catalog.posts().list_all().await.unwrap().remove(0).id;
    catalog.posts().update_enrichment(post_id, 800, 600, Some("abcd")).await.unwrap();

    // A different size guarantees the processor's unchanged-file shortcut
    // (matching size + mtime within 1s) does not fire, regardless of how
    // close together the two writes land on the wall clock.
    write_file(tmp.path(), "a.jpg", b"completely different content of a different length entirely").await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let result = scan_once(&catalog, &library, tmp.path()).await;

    assert_eq!(result.updated, 1);
    assert_eq!(result.added, 0);

    let post = catalog.posts().get_post(post_id).await.unwrap().unwrap();
    assert_eq!(post.width, 0);
    assert_eq!(post.height, 0);
    assert_eq!(post.perceptual_hash, None);
}

#[tokio::test]
async fn adding_an_ignored_prefix_deletes_matching_posts_immediately() {
    let tmp = TempDir::new().unwrap();
    let catalog = new_catalog(&tmp).await;
    catalog.libraries().create_library(&make_library("demo", tmp.path())).await.unwrap();
    let library = catalog.libraries().list_libraries().await.unwrap().remove(0);
    write_file(tmp.path(), "staging/a.jpg", A_JPEG).await;
    write_file(tmp.path(), "keep/b.jpg", A_JPEG).await;

    let result = scan_once(&catalog, &library, tmp.path()).await;
    assert_eq!(result.added, 2);

    catalog.libraries().add_ignored_path(library.id, "staging").await.unwrap();

    // The matching post is gone as soon as the prefix is added, not merely
    // orphaned on the next scan.
    let posts = catalog.posts().list_all().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].relative_path, "keep/b.jpg");

    // A subsequent scan finds nothing new to orphan: the post never
    // reappears (still under the ignored prefix on disk) and the surviving
    // one is untouched.
    let result = scan_once(&catalog, &library, tmp.path()).await;
    assert_eq!(result.orphaned, 0);
    assert_eq!(result.added, 0);
    let posts = catalog.posts().list_all().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].relative_path, "keep/b.jpg");
}
