use keytrace::config::{Config, MAX_HISTOGRAM_BINS, MAX_SUGGESTION_COUNT};
use keytrace::error::KeyTraceError;
use std::fs;

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    fs::write(
        &path,
        r#"{ "patterns": { "max_duration_ms": 2000.0 }, "coverage": { "min_samples_per_pair": 3 } }"#,
    )
    .unwrap();

    let config = Config::load_from_file(&path).unwrap();
    assert_eq!(config.patterns.max_duration_ms, 2000.0);
    assert_eq!(config.patterns.mad_threshold, 3.0);
    assert_eq!(config.coverage.min_samples_per_pair, 3);
    assert_eq!(config.coverage.target_samples_per_pair, 8);
    assert_eq!(config.deviation.word_limit, 100);
}

#[test]
fn test_invalid_file_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    fs::write(&path, r#"{ "patterns": { "histogram_bins": 0 } }"#).unwrap();
    assert!(matches!(
        Config::load_from_file(&path),
        Err(KeyTraceError::Config(_))
    ));
}

#[test]
fn test_oversized_counts_are_rejected() {
    let mut config = Config::default();
    config.coverage.suggestion_count = usize::MAX;
    assert!(matches!(config.validate(), Err(KeyTraceError::Config(_))));

    let mut config = Config::default();
    config.patterns.histogram_bins = MAX_HISTOGRAM_BINS + 1;
    assert!(matches!(config.validate(), Err(KeyTraceError::Config(_))));

    let mut config = Config::default();
    config.coverage.suggestion_count = MAX_SUGGESTION_COUNT;
    config.patterns.histogram_bins = MAX_HISTOGRAM_BINS;
    assert!(config.validate().is_ok());
}

#[test]
fn test_malformed_json_is_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        Config::load_from_file(&path),
        Err(KeyTraceError::Json(_))
    ));
}

#[test]
fn test_missing_file_is_an_io_error() {
    assert!(matches!(
        Config::load_from_file("/definitely/not/here.json"),
        Err(KeyTraceError::Io(_))
    ));
}
