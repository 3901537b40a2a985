//! Configuration schema types
//!
//! This module defines the configuration structure for Stager.

use crate::config::SecretString;
use crate::domain::{Resource, Scheme, ValidationLevel};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Main Stager configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagerConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Scan location, schedule and study resolution
    pub scan: ScanConfig,

    /// Storage backend credentials
    #[serde(default)]
    pub storage: StorageConfig,

    /// Staging directories, locking and validation threshold
    pub etl: EtlConfig,

    /// Transformation command
    pub transformation: TransformationConfig,

    /// Downstream portal commands
    #[serde(default)]
    pub portal: PortalConfig,

    /// Post-load authorization hook
    #[serde(default)]
    pub authorization: AuthorizationConfig,

    /// Reporting backends
    #[serde(default)]
    pub reporting: ReportingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StagerConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.scan.validate()?;
        self.storage.validate()?;
        self.etl.validate()?;
        self.transformation.validate()?;
        self.portal.validate()?;
        self.reporting.validate()?;
        self.logging.validate()?;

        // The scan location must be reachable through the configured backend
        let location_scheme = self.scan.location_resource()?.scheme();
        if location_scheme != self.storage.backend.scheme() {
            return Err(format!(
                "scan.location '{}' uses scheme '{}' but storage.backend is '{}'",
                self.scan.location, location_scheme, self.storage.backend
            ));
        }

        if let Some(share) = self.etl.central_share_resource()? {
            let share_scheme = share.scheme();
            if share_scheme != Scheme::File && share_scheme != self.storage.backend.scheme() {
                return Err(format!(
                    "etl.central_share_location '{}' must be a local path or use the '{}' backend",
                    share,
                    self.storage.backend
                ));
            }
        }

        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Name of this installation, shown in reports
    #[serde(default)]
    pub server_alias: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server_alias: String::new(),
        }
    }
}

/// Layout convention used to turn a scan listing into studies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// A YAML manifest lists the files of every study
    #[default]
    Yaml,
    /// Every subdirectory is a study
    StudyDir,
    /// Every subdirectory is a study holding version subdirectories
    VersionDir,
    /// The scan location is one study version, listed one level deep
    DefinedVersion,
    /// The scan location is `<studyId>/<version>`, listed recursively
    VersionDefined,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Yaml => "yaml",
            StrategyKind::StudyDir => "studydir",
            StrategyKind::VersionDir => "versiondir",
            StrategyKind::DefinedVersion => "definedversion",
            StrategyKind::VersionDefined => "versiondefined",
        };
        f.write_str(name)
    }
}

/// Scan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Root under which new studies are discovered
    pub location: String,

    /// Timer period between scans
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// Stop after this many scans
    #[serde(default)]
    pub iterations: Option<u64>,

    /// Stop after this many consecutive scans that found nothing
    #[serde(default)]
    pub idle_limit: Option<u32>,

    /// Study resolution strategy
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Filename prefix of the YAML manifest
    #[serde(default = "default_yaml_prefix")]
    pub yaml_prefix: String,

    /// Subfolders to restrict extraction to (the study id for `definedversion`)
    #[serde(default)]
    pub extract_folders: Vec<String>,

    /// File recording already processed resources
    #[serde(default)]
    pub ignore_file: Option<String>,

    /// Persist processed resources to the ignore file
    #[serde(default = "default_true")]
    pub ignore_append: bool,

    /// Attempts per file when copying into the staging area
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between copy attempts
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,
}

impl ScanConfig {
    fn validate(&self) -> Result<(), String> {
        self.location_resource()?;

        if self.interval_seconds == 0 {
            return Err("scan.interval_seconds must be > 0".to_string());
        }

        if self.iterations == Some(0) {
            return Err("scan.iterations must be > 0 when set".to_string());
        }

        if self.idle_limit == Some(0) {
            return Err("scan.idle_limit must be > 0 when set".to_string());
        }

        if self.retry_attempts == 0 {
            return Err("scan.retry_attempts must be > 0".to_string());
        }

        if self.strategy == StrategyKind::Yaml && self.yaml_prefix.trim().is_empty() {
            return Err("scan.yaml_prefix cannot be empty for the yaml strategy".to_string());
        }

        if self.strategy == StrategyKind::DefinedVersion && self.folder_names().len() != 1 {
            return Err(format!(
                "scan.extract_folders must name exactly one study for the definedversion strategy, got {}",
                self.folder_names().len()
            ));
        }

        Ok(())
    }

    /// Parsed scan location
    pub fn location_resource(&self) -> Result<Resource, String> {
        if self.location.trim().is_empty() {
            return Err("scan.location cannot be empty".to_string());
        }
        Resource::parse(&self.location).map_err(|e| format!("scan.location: {e}"))
    }

    /// Extract folder names, also splitting comma-separated entries
    pub fn folder_names(&self) -> Vec<String> {
        self.extract_folders
            .iter()
            .flat_map(|entry| entry.split(','))
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    S3,
    Sftp,
}

impl StorageBackend {
    /// Resource scheme served by this backend
    pub fn scheme(&self) -> Scheme {
        match self {
            StorageBackend::Filesystem => Scheme::File,
            StorageBackend::S3 => Scheme::S3,
            StorageBackend::Sftp => Scheme::Sftp,
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageBackend::Filesystem => "filesystem",
            StorageBackend::S3 => "s3",
            StorageBackend::Sftp => "sftp",
        };
        f.write_str(name)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Backend serving the scan location
    #[serde(default)]
    pub backend: StorageBackend,

    /// S3 settings (optional, the default AWS chain is used when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Config>,

    /// SFTP settings (required if backend = sftp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sftp: Option<SftpConfig>,
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        match self.backend {
            StorageBackend::Filesystem => {}
            StorageBackend::S3 => {
                if let Some(ref s3) = self.s3 {
                    s3.validate()?;
                }
            }
            StorageBackend::Sftp => match self.sftp {
                Some(ref sftp) => sftp.validate()?,
                None => {
                    return Err(
                        "storage.sftp configuration is required when storage.backend = 'sftp'"
                            .to_string(),
                    )
                }
            },
        }
        Ok(())
    }
}

/// S3 connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// Custom endpoint for S3-compatible stores
    #[serde(default)]
    pub endpoint: Option<String>,

    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// Static access key id
    #[serde(default)]
    pub access_key: Option<String>,

    /// Static secret access key
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub secret_key: Option<SecretString>,

    /// Use path-style addressing (needed by most S3-compatible stores)
    #[serde(default)]
    pub path_style: bool,
}

impl S3Config {
    fn validate(&self) -> Result<(), String> {
        if self.region.trim().is_empty() {
            return Err("storage.s3.region cannot be empty".to_string());
        }

        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(
                "storage.s3.access_key and storage.s3.secret_key must be set together".to_string(),
            );
        }

        if let Some(ref endpoint) = self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err("storage.s3.endpoint must start with http:// or https://".to_string());
            }
        }

        Ok(())
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_region(),
            access_key: None,
            secret_key: None,
            path_style: false,
        }
    }
}

/// SFTP connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SftpConfig {
    /// SSH port
    #[serde(default = "default_sftp_port")]
    pub port: u16,

    /// Login user
    pub username: String,

    /// Password authentication
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Private key file for public key authentication
    #[serde(default)]
    pub private_key: Option<String>,

    /// Passphrase protecting the private key
    #[serde(default)]
    pub private_key_passphrase: Option<SecretString>,
}

impl SftpConfig {
    fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("storage.sftp.username cannot be empty".to_string());
        }

        if self.password.is_none() && self.private_key.is_none() {
            return Err(
                "storage.sftp requires either password or private_key authentication".to_string(),
            );
        }

        if self.port == 0 {
            return Err("storage.sftp.port must be > 0".to_string());
        }

        Ok(())
    }
}

/// Staging directory layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirFormat {
    /// `base/timestamp/studyId`
    #[default]
    Job,
    /// `base/studyId/version-or-timestamp`
    Study,
}

/// Second path level used by the `study` layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VersionFormat {
    /// Study version, falling back to the timestamp
    #[default]
    Version,
    /// Always the scan timestamp
    Timestamp,
}

/// ETL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    /// Base directory for extracted studies
    pub working_dir: String,

    /// Base directory for transformed studies
    #[serde(default)]
    pub transformation_dir: Option<String>,

    /// Staging directory layout
    #[serde(default)]
    pub dir_format: DirFormat,

    /// Second path level of the `study` layout
    #[serde(default)]
    pub version_format: VersionFormat,

    /// Local port held while a scan is processed
    #[serde(default = "default_lock_port")]
    pub lock_port: u16,

    /// Validation threshold (ERROR or WARNING)
    #[serde(default = "default_validation_level")]
    pub validation_level: String,

    /// Where logs and reports are published
    #[serde(default)]
    pub central_share_location: Option<String>,

    /// Kill external commands running longer than this
    #[serde(default)]
    pub command_timeout_seconds: Option<u64>,
}

impl EtlConfig {
    fn validate(&self) -> Result<(), String> {
        if self.working_dir.trim().is_empty() {
            return Err("etl.working_dir cannot be empty".to_string());
        }

        if self.lock_port == 0 {
            return Err("etl.lock_port must be > 0".to_string());
        }

        self.validation_level
            .parse::<ValidationLevel>()
            .map_err(|_| {
                format!(
                    "Invalid etl.validation_level '{}'. Must be one of: ERROR, WARNING",
                    self.validation_level
                )
            })?;

        if self.command_timeout_seconds == Some(0) {
            return Err("etl.command_timeout_seconds must be > 0 when set".to_string());
        }

        self.central_share_resource()?;
        Ok(())
    }

    /// Parsed central share location, if configured
    pub fn central_share_resource(&self) -> Result<Option<Resource>, String> {
        match self.central_share_location.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(location) => Resource::parse(location)
                .map(Some)
                .map_err(|e| format!("etl.central_share_location: {e}")),
        }
    }
}

/// Transformation configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransformationConfig {
    /// Studies are expected to arrive ready for validation
    #[serde(default)]
    pub skip: bool,

    /// Transformation command line (script path followed by arguments)
    #[serde(default)]
    pub command_script: Option<String>,

    /// Container image wrapping the transformation
    #[serde(default)]
    pub docker_image: Option<String>,
}

impl TransformationConfig {
    fn validate(&self) -> Result<(), String> {
        let has_script = self.script().is_some();
        let has_image = self.image().is_some();

        if self.skip && has_script {
            return Err(
                "transformation.skip is set, so transformation.command_script must not be defined"
                    .to_string(),
            );
        }
        if self.skip && has_image {
            return Err(
                "transformation.skip is set, so transformation.docker_image must not be defined"
                    .to_string(),
            );
        }
        if !self.skip && !has_script && !has_image {
            return Err(
                "At least one of transformation.command_script and transformation.docker_image needs to be defined when transformation.skip is false"
                    .to_string(),
            );
        }
        Ok(())
    }

    /// Non-blank command script
    pub fn script(&self) -> Option<&str> {
        self.command_script
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Non-blank docker image
    pub fn image(&self) -> Option<&str> {
        self.docker_image
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// How the downstream portal is run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PortalMode {
    /// Scripts and servlet container on this host
    #[default]
    Local,
    /// Services managed by docker-compose
    Compose,
}

/// Downstream portal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub mode: PortalMode,

    /// Portal source checkout (local mode)
    #[serde(default = "default_dot")]
    pub source: String,

    /// Compose service running the portal (compose mode)
    #[serde(default)]
    pub compose_service: Option<String>,

    /// Directory docker-compose is run from
    #[serde(default = "default_dot")]
    pub compose_context: String,

    /// Extra compose files passed with `-f`
    #[serde(default)]
    pub compose_extensions: Vec<String>,
}

impl PortalConfig {
    fn validate(&self) -> Result<(), String> {
        match self.mode {
            PortalMode::Local => {
                if self.source.trim().is_empty() {
                    return Err("portal.source cannot be empty in local mode".to_string());
                }
            }
            PortalMode::Compose => {
                if self
                    .compose_service
                    .as_deref()
                    .map_or(true, |s| s.trim().is_empty())
                {
                    return Err(
                        "portal.compose_service is required when portal.mode = 'compose'"
                            .to_string(),
                    );
                }
            }
        }
        Ok(())
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            mode: PortalMode::Local,
            source: default_dot(),
            compose_service: None,
            compose_context: default_dot(),
            compose_extensions: Vec::new(),
        }
    }
}

/// Authorization hook configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthorizationConfig {
    /// Command prefix; the study id and curator email are appended
    #[serde(default)]
    pub command_prefix: Option<String>,

    /// Curators granted access to every newly loaded study
    #[serde(default)]
    pub curator_emails: Vec<String>,
}

impl AuthorizationConfig {
    /// Whether the hook has something to run
    pub fn is_enabled(&self) -> bool {
        self.command_prefix
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
            && !self.curator_emails.is_empty()
    }
}

/// Reporting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// Enable the log-file reporting backend
    #[serde(default)]
    pub log_enabled: bool,

    /// Report log file
    #[serde(default)]
    pub log_file: Option<String>,

    /// Entry format (text or html)
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Create the report log and its directory at startup
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

impl ReportingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_formats = ["text", "html"];
        if !valid_formats.contains(&self.log_format.as_str()) {
            return Err(format!(
                "Invalid reporting.log_format '{}'. Must be one of: {}",
                self.log_format,
                valid_formats.join(", ")
            ));
        }

        if self.log_enabled
            && self
                .log_file
                .as_deref()
                .map_or(true, |f| f.trim().is_empty())
        {
            return Err("reporting.log_file is required when reporting.log_enabled = true".to_string());
        }

        Ok(())
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            log_enabled: false,
            log_file: None,
            log_format: default_log_format(),
            create_if_missing: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_interval_seconds() -> u64 {
    60
}

fn default_yaml_prefix() -> String {
    "list_of_studies".to_string()
}

fn default_retry_attempts() -> u32 {
    5
}

fn default_retry_delay_seconds() -> u64 {
    300
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_sftp_port() -> u16 {
    22
}

fn default_lock_port() -> u16 {
    9999
}

fn default_validation_level() -> String {
    "ERROR".to_string()
}

fn default_dot() -> String {
    ".".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_local_path() -> String {
    "/var/log/stager".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
