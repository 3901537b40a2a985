//! Integration tests for logging functionality

use stager::config::LoggingConfig;
use stager::domain::{ExitStatus, StagerError, StudyId};
use stager::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_invalid_level_is_rejected_before_install() {
    let err = init_logging("verbose", &LoggingConfig::default()).err().unwrap();
    assert!(err.to_string().contains("Invalid log level"));
}

// The global subscriber can only be installed once per process, so this is
// the only test that initializes logging successfully.
#[test]
fn test_file_logging_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs").join("stager");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };
    assert!(!log_path.exists());

    let guard = init_logging("debug", &config).expect("Failed to initialize logging");
    assert!(log_path.is_dir());

    let study_id = StudyId::new("brca_tcga").unwrap();
    stager::log_study_step!(&study_id, "validation", ExitStatus::Warning);
    stager::log_retry_attempt!(2, 5, "Connection reset");
    let error = StagerError::Configuration("Invalid config".to_string());
    stager::log_error_with_context!(&error, "Failed to load configuration");

    drop(guard);
    assert!(log_path.join("stager.log").exists());
}
