//! Configuration management for Stager.
//!
//! Stager uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `STAGER_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation of every section on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use stager::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("stager.toml")?;
//! println!("Scanning {} every {}s", config.scan.location, config.scan.interval_seconds);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level and server alias
//! - [`ScanConfig`] - scan location, schedule, strategy and ignore file
//! - [`StorageConfig`] - filesystem, S3 or SFTP backend settings
//! - [`EtlConfig`] - staging layout, lock port and validation threshold
//! - [`TransformationConfig`] - transformation command
//! - [`PortalConfig`] - local or docker-compose portal commands
//! - [`AuthorizationConfig`] - post-load authorization hook
//! - [`ReportingConfig`] - report log backend
//! - [`LoggingConfig`] - file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [scan]
//! location = "s3://incoming-studies/drop"
//! strategy = "yaml"
//! ignore_file = "/var/lib/stager/ignore.txt"
//!
//! [storage]
//! backend = "s3"
//!
//! [storage.s3]
//! access_key = "${STAGER_S3_ACCESS_KEY}"
//! secret_key = "${STAGER_S3_SECRET_KEY}"
//!
//! [etl]
//! working_dir = "/srv/staging"
//!
//! [transformation]
//! skip = true
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, AuthorizationConfig, DirFormat, EtlConfig, LoggingConfig, PortalConfig,
    PortalMode, ReportingConfig, S3Config, ScanConfig, SftpConfig, StagerConfig, StorageBackend,
    StorageConfig, StrategyKind, TransformationConfig, VersionFormat,
};
pub use secret::{secret_string, SecretString, SecretValue};
