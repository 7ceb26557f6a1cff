//! Integration tests for logging functionality
//!
//! The global subscriber can only be installed once per process, so the
//! file logging checks live in a single test.

use shroud::config::LoggingConfig;
use shroud::domain::ShroudError;
use shroud::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_invalid_level_rejected_before_install() {
    let result = init_logging("verbose", &LoggingConfig::default());
    assert!(matches!(result, Err(ShroudError::Configuration(_))));
}

#[test]
fn test_file_logging_writes_json_lines() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");
    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };

    let guard = init_logging("info", &config).unwrap();
    assert!(log_path.exists());

    tracing::info!(target: "shroud::pipeline", records = 3, "Stage completed");

    // A second subscriber cannot be installed
    assert!(init_logging("info", &config).is_err());

    drop(guard);

    let content = std::fs::read_to_string(log_path.join("shroud.log")).unwrap();
    let entry = content
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .find(|entry| entry["fields"]["message"] == "Stage completed")
        .expect("stage entry in log file");
    assert_eq!(entry["fields"]["records"], 3);
    assert_eq!(entry["target"], "shroud::pipeline");
}
