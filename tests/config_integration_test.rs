//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables should be run with --test-threads=1
//! to avoid interference between tests.

use secrecy::ExposeSecret;
use stager::config::{load_config, DirFormat, PortalMode, StorageBackend, StrategyKind};
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("STAGER_APPLICATION_LOG_LEVEL");
    std::env::remove_var("STAGER_SCAN_LOCATION");
    std::env::remove_var("STAGER_SCAN_INTERVAL_SECONDS");
    std::env::remove_var("STAGER_SCAN_STRATEGY");
    std::env::remove_var("STAGER_ETL_LOCK_PORT");
    std::env::remove_var("STAGER_ETL_VALIDATION_LEVEL");
    std::env::remove_var("STAGER_SFTP_PASSWORD");
    std::env::remove_var("TEST_STAGER_SFTP_PASSWORD");
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let toml_content = r#"
[application]
log_level = "debug"
server_alias = "portal-prod"

[scan]
location = "sftp://drop@files.example.org:2222/incoming"
interval_seconds = 120
iterations = 4
idle_limit = 2
strategy = "versiondir"
extract_folders = ["brca_tcga", "luad_tcga"]
ignore_file = "/var/lib/stager/ignore.txt"
ignore_append = false
retry_attempts = 3
retry_delay_seconds = 10

[storage]
backend = "sftp"

[storage.sftp]
port = 2222
username = "drop"
private_key = "/home/stager/.ssh/id_ed25519"

[etl]
working_dir = "/srv/staging"
transformation_dir = "/srv/transformed"
dir_format = "study"
lock_port = 9100
validation_level = "WARNING"
central_share_location = "/shared/stager"
command_timeout_seconds = 600

[transformation]
command_script = "/opt/transform/transform.sh --strict"
docker_image = "example/transform:1.2"

[portal]
mode = "compose"
compose_service = "cbioportal"
compose_context = "/opt/compose"
compose_extensions = ["docker-compose.yml", "open-ports.yml"]

[authorization]
command_prefix = "/opt/portal/grant.sh"
curator_emails = ["curator@example.org"]

[reporting]
log_enabled = true
log_file = "/var/log/stager/report.html"
log_format = "html"

[logging]
local_enabled = true
local_path = "/tmp/stager"
local_rotation = "hourly"
"#;

    let temp_file = write_config(toml_content);
    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.application.server_alias, "portal-prod");

    assert_eq!(config.scan.interval_seconds, 120);
    assert_eq!(config.scan.iterations, Some(4));
    assert_eq!(config.scan.idle_limit, Some(2));
    assert_eq!(config.scan.strategy, StrategyKind::VersionDir);
    assert_eq!(config.scan.folder_names(), vec!["brca_tcga", "luad_tcga"]);
    assert!(!config.scan.ignore_append);
    assert_eq!(config.scan.retry_attempts, 3);

    assert_eq!(config.storage.backend, StorageBackend::Sftp);
    let sftp = config.storage.sftp.as_ref().unwrap();
    assert_eq!(sftp.port, 2222);
    assert_eq!(sftp.username, "drop");

    assert_eq!(config.etl.dir_format, DirFormat::Study);
    assert_eq!(config.etl.lock_port, 9100);
    assert_eq!(config.etl.validation_level, "WARNING");
    assert!(config.etl.central_share_resource().unwrap().is_some());

    assert_eq!(config.transformation.script(), Some("/opt/transform/transform.sh --strict"));
    assert_eq!(config.transformation.image(), Some("example/transform:1.2"));

    assert_eq!(config.portal.mode, PortalMode::Compose);
    assert_eq!(config.portal.compose_extensions.len(), 2);
    assert!(config.authorization.is_enabled());

    assert!(config.reporting.log_enabled);
    assert_eq!(config.reporting.log_format, "html");

    assert!(config.logging.local_enabled);
    assert_eq!(config.logging.local_rotation, "hourly");
}

#[test]
fn test_load_minimal_config_with_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let toml_content = r#"
[scan]
location = "/data/incoming"

[etl]
working_dir = "/srv/staging"

[transformation]
skip = true
"#;

    let temp_file = write_config(toml_content);
    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.application.log_level, "info");
    assert_eq!(config.scan.strategy, StrategyKind::Yaml);
    assert_eq!(config.scan.yaml_prefix, "list_of_studies");
    assert_eq!(config.scan.interval_seconds, 60);
    assert!(config.scan.ignore_append);
    assert_eq!(config.storage.backend, StorageBackend::Filesystem);
    assert_eq!(config.etl.dir_format, DirFormat::Job);
    assert_eq!(config.etl.validation_level, "ERROR");
    assert_eq!(config.portal.mode, PortalMode::Local);
    assert!(!config.authorization.is_enabled());
    assert!(!config.reporting.log_enabled);
    assert!(!config.logging.local_enabled);
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("TEST_STAGER_SFTP_PASSWORD", "secret_pass");

    let toml_content = r#"
[scan]
location = "sftp://drop@files.example.org/incoming"

[storage]
backend = "sftp"

[storage.sftp]
username = "drop"
password = "${TEST_STAGER_SFTP_PASSWORD}"

[etl]
working_dir = "/srv/staging"

[transformation]
skip = true
"#;

    let temp_file = write_config(toml_content);
    let config = load_config(temp_file.path()).expect("Failed to load config");

    let sftp = config.storage.sftp.unwrap();
    let password = sftp.password.unwrap();
    assert_eq!(password.expose_secret().as_ref(), "secret_pass");
    assert_eq!(sftp.port, 22);

    std::env::remove_var("TEST_STAGER_SFTP_PASSWORD");
}

#[test]
fn test_env_var_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("STAGER_APPLICATION_LOG_LEVEL", "trace");
    std::env::set_var("STAGER_SCAN_STRATEGY", "StudyDir");
    std::env::set_var("STAGER_ETL_LOCK_PORT", "9200");
    std::env::set_var("STAGER_ETL_VALIDATION_LEVEL", "WARNING");

    let toml_content = r#"
[application]
log_level = "info"

[scan]
location = "/data/incoming"
strategy = "yaml"

[etl]
working_dir = "/srv/staging"
lock_port = 9999

[transformation]
skip = true
"#;

    let temp_file = write_config(toml_content);
    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.application.log_level, "trace");
    assert_eq!(config.scan.strategy, StrategyKind::StudyDir);
    assert_eq!(config.etl.lock_port, 9200);
    assert_eq!(config.etl.validation_level, "WARNING");

    cleanup_env_vars();
}

#[test]
fn test_invalid_override_is_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("STAGER_ETL_LOCK_PORT", "not-a-port");

    let toml_content = r#"
[scan]
location = "/data/incoming"

[etl]
working_dir = "/srv/staging"

[transformation]
skip = true
"#;

    let temp_file = write_config(toml_content);
    let err = load_config(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("STAGER_ETL_LOCK_PORT"));

    cleanup_env_vars();
}

#[test]
fn test_invalid_config_validation() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let cases = [
        // Unknown log level
        r#"
[application]
log_level = "invalid_level"
[scan]
location = "/data/incoming"
[etl]
working_dir = "/srv/staging"
[transformation]
skip = true
"#,
        // Scheme does not match the backend
        r#"
[scan]
location = "s3://bucket/incoming"
[etl]
working_dir = "/srv/staging"
[transformation]
skip = true
"#,
        // Skipping transformation while naming a script
        r#"
[scan]
location = "/data/incoming"
[etl]
working_dir = "/srv/staging"
[transformation]
skip = true
command_script = "/opt/transform.sh"
"#,
        // Neither script nor image
        r#"
[scan]
location = "/data/incoming"
[etl]
working_dir = "/srv/staging"
[transformation]
skip = false
"#,
        // definedversion needs exactly one study folder
        r#"
[scan]
location = "/data/incoming"
strategy = "definedversion"
[etl]
working_dir = "/srv/staging"
[transformation]
skip = true
"#,
        // Unknown validation level
        r#"
[scan]
location = "/data/incoming"
[etl]
working_dir = "/srv/staging"
validation_level = "INFO"
[transformation]
skip = true
"#,
        // Compose mode without a service
        r#"
[scan]
location = "/data/incoming"
[etl]
working_dir = "/srv/staging"
[transformation]
skip = true
[portal]
mode = "compose"
"#,
    ];

    for toml_content in cases {
        let temp_file = write_config(toml_content);
        assert!(
            load_config(temp_file.path()).is_err(),
            "expected rejection of:\n{toml_content}"
        );
    }
}

#[test]
fn test_missing_env_var_is_reported() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let toml_content = r#"
[scan]
location = "/data/incoming"
ignore_file = "${TEST_STAGER_UNSET_IGNORE_FILE}"

[etl]
working_dir = "/srv/staging"

[transformation]
skip = true
"#;

    let temp_file = write_config(toml_content);
    let err = load_config(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("TEST_STAGER_UNSET_IGNORE_FILE"));
}
