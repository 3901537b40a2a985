//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{StagerConfig, StorageBackend};
use super::secret::secret_string;
use crate::domain::errors::StagerError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into StagerConfig
/// 4. Applies environment variable overrides (STAGER_* prefix)
/// 5. Validates the configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use stager::config::loader::load_config;
///
/// let config = load_config("stager.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<StagerConfig> {
    let path = path.as_ref();

    // Check if file exists
    if !path.exists() {
        return Err(StagerError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    // Read file contents
    let contents = fs::read_to_string(path).map_err(|e| {
        StagerError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    // Perform environment variable substitution
    let contents = substitute_env_vars(&contents)?;

    // Parse TOML
    let mut config: StagerConfig = toml::from_str(&contents)
        .map_err(|e| StagerError::Configuration(format!("Failed to parse TOML: {e}")))?;

    // Apply environment variable overrides
    apply_env_overrides(&mut config)?;

    // Validate configuration
    config.validate().map_err(|e| {
        StagerError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| StagerError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    // Process line by line to skip comments
    for line in input.lines() {
        let trimmed = line.trim_start();

        // Skip comment lines - don't process env vars in comments
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(StagerError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        StagerError::Configuration(format!("Invalid value '{value}' for {name}"))
    })
}

/// Applies environment variable overrides using STAGER_* prefix
///
/// Environment variables follow the pattern: STAGER_<SECTION>_<KEY>
/// For example: STAGER_SCAN_LOCATION, STAGER_ETL_LOCK_PORT
fn apply_env_overrides(config: &mut StagerConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("STAGER_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Scan overrides
    if let Ok(val) = std::env::var("STAGER_SCAN_LOCATION") {
        config.scan.location = val;
    }
    if let Ok(val) = std::env::var("STAGER_SCAN_INTERVAL_SECONDS") {
        config.scan.interval_seconds = parse_override("STAGER_SCAN_INTERVAL_SECONDS", &val)?;
    }
    if let Ok(val) = std::env::var("STAGER_SCAN_STRATEGY") {
        config.scan.strategy = toml::Value::String(val.trim().to_lowercase())
            .try_into()
            .map_err(|_| {
                StagerError::Configuration(format!(
                    "Invalid value '{val}' for STAGER_SCAN_STRATEGY"
                ))
            })?;
    }
    if let Ok(val) = std::env::var("STAGER_SCAN_IGNORE_FILE") {
        config.scan.ignore_file = Some(val);
    }

    // Storage overrides
    if let Ok(val) = std::env::var("STAGER_STORAGE_BACKEND") {
        config.storage.backend = match val.trim().to_lowercase().as_str() {
            "filesystem" => StorageBackend::Filesystem,
            "s3" => StorageBackend::S3,
            "sftp" => StorageBackend::Sftp,
            _ => {
                return Err(StagerError::Configuration(format!(
                    "Invalid value '{val}' for STAGER_STORAGE_BACKEND"
                )))
            }
        };
    }
    if let Ok(val) = std::env::var("STAGER_S3_ACCESS_KEY") {
        config.storage.s3.get_or_insert_with(Default::default).access_key = Some(val);
    }
    if let Ok(val) = std::env::var("STAGER_S3_SECRET_KEY") {
        config.storage.s3.get_or_insert_with(Default::default).secret_key =
            Some(secret_string(val));
    }
    // SFTP overrides (only if SFTP is configured)
    if let Some(ref mut sftp) = config.storage.sftp {
        if let Ok(val) = std::env::var("STAGER_SFTP_USERNAME") {
            sftp.username = val;
        }
        if let Ok(val) = std::env::var("STAGER_SFTP_PASSWORD") {
            sftp.password = Some(secret_string(val));
        }
    }

    // ETL overrides
    if let Ok(val) = std::env::var("STAGER_ETL_WORKING_DIR") {
        config.etl.working_dir = val;
    }
    if let Ok(val) = std::env::var("STAGER_ETL_LOCK_PORT") {
        config.etl.lock_port = parse_override("STAGER_ETL_LOCK_PORT", &val)?;
    }
    if let Ok(val) = std::env::var("STAGER_ETL_VALIDATION_LEVEL") {
        config.etl.validation_level = val;
    }
    if let Ok(val) = std::env::var("STAGER_ETL_CENTRAL_SHARE_LOCATION") {
        config.etl.central_share_location = Some(val);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("STAGER_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("STAGER_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
