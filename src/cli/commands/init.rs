//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "stager.toml")]
    pub output: String,

    /// Include every option with comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Stager configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Set scan.location and etl.working_dir (the directory must exist)");
                println!("  3. Put storage credentials in a .env file if you scan S3 or SFTP");
                println!("  4. Validate configuration: stager validate-config");
                println!("  5. Run a single scan: stager scan --once");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Stager Configuration File
# Scheduled study staging and loading

[application]
log_level = "info"
server_alias = ""

[scan]
location = "/data/incoming"
interval_seconds = 60
strategy = "yaml"
yaml_prefix = "list_of_studies"
ignore_file = "/var/lib/stager/ignore.txt"

[storage]
backend = "filesystem"

[etl]
working_dir = "/var/lib/stager/work"
validation_level = "ERROR"
lock_port = 9999

[transformation]
command_script = "/opt/transform/transform.sh"

[portal]
mode = "local"
source = "/opt/cbioportal"

[reporting]
log_enabled = true
log_file = "/var/log/stager/report.log"
log_format = "text"

[logging]
local_enabled = false
local_path = "/var/log/stager"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Stager Configuration File
# Scheduled study staging and loading
#
# Values of the form ${VAR} are replaced by environment variables.
# Any STAGER_<SECTION>_<KEY> environment variable overrides the file.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Name of this installation, shown in reports
server_alias = "staging-01"

# ============================================================================
# Scan Configuration
# ============================================================================
[scan]
# Scan root: absolute path, file://, s3://bucket/prefix or sftp://user@host:port/path
location = "/data/incoming"

# Seconds between scans
interval_seconds = 60

# Stop after this many scans (optional)
# iterations = 10

# Stop after this many consecutive scans that found nothing (optional)
# idle_limit = 3

# How studies are laid out below the scan location:
# - yaml: a manifest <yaml_prefix>*.yaml lists the files of each study
# - studydir: every subdirectory is a study
# - versiondir: every subdirectory is a study, its newest subdirectory the version
# - definedversion: the location is one version of the study named in extract_folders
# - versiondefined: the location is <studyId>/<version>
strategy = "yaml"

# Manifest filename prefix for the yaml strategy
yaml_prefix = "list_of_studies"

# Restrict extraction to these folders (the study id for definedversion)
extract_folders = []

# Already processed resources, one URI per line
ignore_file = "/var/lib/stager/ignore.txt"

# Write processed resources to the ignore file
ignore_append = true

# Copy attempts per file and delay between attempts
retry_attempts = 5
retry_delay_seconds = 300

# ============================================================================
# Storage Configuration
# ============================================================================
[storage]
# filesystem | s3 | sftp, must match the scheme of scan.location
backend = "filesystem"

# [storage.s3]
# endpoint = "http://localhost:9000"   # S3-compatible stores only
# region = "us-east-1"
# access_key = "${STAGER_S3_ACCESS_KEY}"
# secret_key = "${STAGER_S3_SECRET_KEY}"
# path_style = true

# [storage.sftp]
# port = 22
# username = "${STAGER_SFTP_USERNAME}"
# password = "${STAGER_SFTP_PASSWORD}"
# private_key = "/home/stager/.ssh/id_ed25519"
# private_key_passphrase = "${STAGER_SFTP_KEY_PASSPHRASE}"

# ============================================================================
# ETL Configuration
# ============================================================================
[etl]
# Base directory for extracted studies (must exist)
working_dir = "/var/lib/stager/work"

# Base directory for transformed studies (default: <study>/staging)
# transformation_dir = "/var/lib/stager/transformed"

# Staging layout: job (timestamp/studyId) or study (studyId/version)
dir_format = "job"

# Second level of the study layout: version or timestamp
version_format = "version"

# Port on 127.0.0.1 held while studies are processed
lock_port = 9999

# ERROR loads studies with validation warnings, WARNING does not
validation_level = "ERROR"

# Where logs and reports are copied after each study (optional)
# central_share_location = "/shared/stager"

# Kill external commands running longer than this (optional)
# command_timeout_seconds = 3600

# ============================================================================
# Transformation
# ============================================================================
[transformation]
# Studies arrive ready for validation (no script or image allowed then)
skip = false

# Script path followed by fixed arguments; -i <in> -o <out> is appended
command_script = "/opt/transform/transform.sh"

# Run the script inside this image (optional)
# docker_image = "example/transform:latest"

# ============================================================================
# Portal
# ============================================================================
[portal]
# local: scripts in a source checkout, compose: docker-compose service
mode = "local"
source = "/opt/cbioportal"

# compose_service = "cbioportal"
# compose_context = "/opt/cbioportal-docker-compose"
# compose_extensions = ["docker-compose.yml", "open-ports.yml"]

# ============================================================================
# Authorization hook (optional)
# ============================================================================
[authorization]
# Study id and curator email are appended to this command
# command_prefix = "/opt/portal/grant-access.sh --db portal"
curator_emails = []

# ============================================================================
# Reporting
# ============================================================================
[reporting]
log_enabled = true
log_file = "/var/log/stager/report.log"

# text or html
log_format = "text"

# Create the report log and its directory at startup
create_if_missing = true

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable local file logging (JSON lines)
local_enabled = true

# Local log directory
local_path = "/var/log/stager"

# Log rotation (daily, hourly or never)
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StagerConfig;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "stager.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "stager.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generated_configs_parse() {
        for content in [
            InitArgs::generate_minimal_config(),
            InitArgs::generate_config_with_examples(),
        ] {
            let config: StagerConfig = toml::from_str(&content).unwrap();
            assert_eq!(config.scan.location, "/data/incoming");
            assert_eq!(config.etl.lock_port, 9999);
        }
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let args = InitArgs {
            output: file.path().to_string_lossy().into_owned(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);

        let args = InitArgs { force: true, ..args };
        assert_eq!(args.execute().await.unwrap(), 0);
        assert!(std::fs::read_to_string(file.path()).unwrap().contains("[scan]"));
    }
}
