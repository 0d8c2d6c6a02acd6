use std::io::Write;

use curio_config::Settings;

#[test]
fn defaults_resolve_without_a_config_file() {
    let settings = Settings::load(None).expect("defaults should always validate");
    assert!(settings.scanner.parallelism >= 1);
    assert_eq!(settings.processing.job_progress_report_interval_ms, 250);
    assert_eq!(settings.perceptual_similarity.hamming_threshold, 31);
    assert!(settings.ingestion.channel_capacity >= 10);
}

#[test]
fn toml_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("curio.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        r#"
        [scanner]
        parallelism = 4

        [perceptual_similarity]
        hamming_threshold = 10
        "#
    )
    .unwrap();

    let settings = Settings::load(Some(&path)).unwrap();
    assert_eq!(settings.scanner.parallelism, 4);
    assert_eq!(settings.perceptual_similarity.hamming_threshold, 10);
    // Untouched sections keep their defaults.
    assert_eq!(settings.ingestion.batch_size, 50);
}

#[test]
fn missing_config_path_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");
    let settings = Settings::load(Some(&path)).unwrap();
    assert_eq!(settings.ingestion.batch_size, 50);
}

#[test]
fn rejects_zero_scanner_parallelism() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("curio.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "[scanner]\nparallelism = 0").unwrap();

    let err = Settings::load(Some(&path)).unwrap_err();
    assert!(matches!(err, curio_config::ConfigError::Invalid(_)));
}
