//! The two jobs the scheduler's default table names directly
//! (`scan-all-libraries`, `find-duplicates`), each wrapping an engine
//! component that's independently tested elsewhere in this directory.

mod support;

use std::sync::Arc;
use std::time::Duration;

use curio_core::duplicates::DuplicateDetector;
use curio_core::ingestion::PostIngestionPipeline;
use curio_core::jobs::{FindDuplicatesJob, Job, JobContext, JobMode, JobReporter, ScanAllLibrariesJob};
use curio_model::prelude::JobExecutionId;
use support::{make_library, make_processor, new_catalog, write_file};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn context(job_key: &str) -> JobContext {
    JobContext {
        reporter: Arc::new(JobReporter::new(
            JobExecutionId::new(),
            job_key.to_string(),
            job_key.to_string(),
            Duration::from_secs(0),
        )),
        cancel: CancellationToken::new(),
        mode: JobMode::Missing,
    }
}

#[tokio::test]
async fn scan_all_libraries_reconciles_every_registered_library() {
    let tmp = TempDir::new().unwrap();
    let catalog = new_catalog(&tmp).await;

    let lib_a_root = tmp.path().join("lib-a");
    let lib_b_root = tmp.path().join("lib-b");
    tokio::fs::create_dir_all(&lib_a_root).await.unwrap();
    tokio::fs::create_dir_all(&lib_b_root).await.unwrap();
    write_file(&lib_a_root, "a.jpg", b"hello world").await;
    write_file(&lib_b_root, "sub/b.png", b"other bytes").await;

    catalog.libraries().create_library(&make_library("lib-a", &lib_a_root)).await.unwrap();
    catalog.libraries().create_library(&make_library("lib-b", &lib_b_root)).await.unwrap();

    let ingestion = Arc::new(PostIngestionPipeline::spawn(catalog.clone(), 10, 5));
    let processor = Arc::new(make_processor(&catalog, ingestion.clone()));

    let job = ScanAllLibrariesJob::new(catalog.libraries(), processor);
    job.execute(context("scan-all-libraries")).await.unwrap();
    ingestion.flush().await.unwrap();
    drop(job);
    Arc::try_unwrap(ingestion).ok().unwrap().shutdown().await.unwrap();

    let all_posts = catalog.posts().list_all().await.unwrap();
    assert_eq!(all_posts.len(), 2);
    assert!(all_posts.iter().any(|p| p.relative_path == "a.jpg"));
    assert!(all_posts.iter().any(|p| p.relative_path == "sub/b.png"));
}

#[tokio::test]
async fn scan_all_libraries_is_a_no_op_with_nothing_registered() {
    let tmp = TempDir::new().unwrap();
    let catalog = new_catalog(&tmp).await;
    let ingestion = Arc::new(PostIngestionPipeline::spawn(catalog.clone(), 10, 5));
    let processor = Arc::new(make_processor(&catalog, ingestion.clone()));

    let job = ScanAllLibrariesJob::new(catalog.libraries(), processor);
    job.execute(context("scan-all-libraries")).await.unwrap();

    drop(job);
    Arc::try_unwrap(ingestion).ok().unwrap().shutdown().await.unwrap();
    assert!(catalog.posts().list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn find_duplicates_job_records_exact_group_count_in_the_result() {
    use chrono::Utc;
    use curio_model::prelude::Post;

    let tmp = TempDir::new().unwrap();
    let catalog = new_catalog(&tmp).await;
    catalog.libraries().create_library(&make_library("demo", tmp.path())).await.unwrap();
    let library = catalog.libraries().list_libraries().await.unwrap().remove(0);

    let make_post = |path: &str, hash: &str| Post {
        id: curio_model::ids::PostId::new(),
        library_id: library.id,
        relative_path: path.to_string(),
        content_hash: hash.to_string(),
        size_bytes: 100,
        file_modified_date: Utc::now(),
        import_date: Utc::now(),
        width: 0,
        height: 0,
        content_type: "image/png".to_string(),
        perceptual_hash: None,
        is_favorite: false,
        file_identity_device: None,
        file_identity_value: None,
    };
    catalog
        .posts()
        .insert_batch(&[make_post("a.png", "deadbeef"), make_post("b.png", "deadbeef")])
        .await
        .unwrap();

    let detector = Arc::new(DuplicateDetector::new(catalog.posts(), catalog.duplicates(), 31));
    let job = FindDuplicatesJob::new(detector);
    let ctx = context("find-duplicates");
    let reporter = ctx.reporter.clone();
    job.execute(ctx).await.unwrap();

    let snapshot = reporter.flush();
    assert!(snapshot.final_text.unwrap().contains("1 exact duplicate groups"));
    assert_eq!(snapshot.result_schema_version, Some(1));
    let result: serde_json::Value = serde_json::from_str(&snapshot.result_json.unwrap()).unwrap();
    assert_eq!(result["exactGroupsCreated"], 1);
}
