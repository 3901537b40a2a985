//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Stager configuration file.

use crate::config::load_config;
use crate::config::{PortalMode, StorageBackend};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading validates every section
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        if !config.application.server_alias.is_empty() {
            println!("  Server Alias: {}", config.application.server_alias);
        }
        println!("  Scan Location: {}", config.scan.location);
        println!("  Storage Backend: {}", config.storage.backend);
        if config.storage.backend == StorageBackend::Sftp {
            if let Some(ref sftp) = config.storage.sftp {
                println!("  SFTP User: {} (port {})", sftp.username, sftp.port);
            }
        }
        println!("  Strategy: {}", config.scan.strategy);
        println!("  Scan Interval: {}s", config.scan.interval_seconds);
        match config.scan.idle_limit {
            Some(limit) => println!("  Idle Limit: {limit} scans"),
            None => println!("  Idle Limit: none"),
        }
        println!("  Working Directory: {}", config.etl.working_dir);
        println!("  Validation Level: {}", config.etl.validation_level);
        if config.transformation.skip {
            println!("  Transformation: skipped");
        } else {
            if let Some(script) = config.transformation.script() {
                println!("  Transformation Script: {script}");
            }
            if let Some(image) = config.transformation.image() {
                println!("  Transformation Image: {image}");
            }
        }
        match config.portal.mode {
            PortalMode::Local => println!("  Portal: local ({})", config.portal.source),
            PortalMode::Compose => println!(
                "  Portal: docker-compose service {}",
                config.portal.compose_service.as_deref().unwrap_or_default()
            ),
        }
        println!(
            "  Central Share: {}",
            config
                .etl
                .central_share_location
                .as_deref()
                .unwrap_or("not configured")
        );
        println!(
            "  Ignore File: {}",
            config.scan.ignore_file.as_deref().unwrap_or("in memory only")
        );
        println!(
            "  Report Log: {}",
            if config.reporting.log_enabled {
                config.reporting.log_file.as_deref().unwrap_or_default()
            } else {
                "disabled"
            }
        );
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_valid_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[scan]
location = {location:?}

[etl]
working_dir = {location:?}

[transformation]
skip = true
"#,
            location = dir.path().to_string_lossy()
        )
        .unwrap();

        let code = ValidateArgs {}
            .execute(&file.path().to_string_lossy())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_invalid_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[scan]\nlocation = \"/data\"\n").unwrap();

        let code = ValidateArgs {}
            .execute(&file.path().to_string_lossy())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
