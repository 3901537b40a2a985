//! Storage provider factory
//!
//! This module provides factory functions to create resource providers based on configuration.

use super::filesystem::FileSystemProvider;
use super::s3::S3Provider;
use super::sftp::SftpProvider;
use super::traits::ResourceProvider;
use crate::config::{StagerConfig, StorageBackend};
use crate::domain::{Result, Scheme, StagerError};
use std::sync::Arc;

/// Create the provider serving the scan location
///
/// # Errors
///
/// Returns a configuration error if the selected backend lacks its settings,
/// or an error if the client cannot be built.
pub async fn create_resource_provider(
    config: &StagerConfig,
) -> Result<Arc<dyn ResourceProvider + Send + Sync>> {
    match config.storage.backend {
        StorageBackend::Filesystem => {
            tracing::info!("Creating filesystem provider");
            Ok(Arc::new(FileSystemProvider::new()) as Arc<dyn ResourceProvider + Send + Sync>)
        }
        StorageBackend::S3 => {
            tracing::info!("Creating S3 provider");
            let s3_config = config.storage.s3.clone().unwrap_or_default();
            let provider = S3Provider::new(&s3_config).await?;
            Ok(Arc::new(provider) as Arc<dyn ResourceProvider + Send + Sync>)
        }
        StorageBackend::Sftp => {
            let sftp_config = config.storage.sftp.clone().ok_or_else(|| {
                StagerError::Configuration(
                    "storage.sftp configuration is required when storage.backend = 'sftp'"
                        .to_string(),
                )
            })?;

            tracing::info!(port = sftp_config.port, "Creating SFTP provider");
            Ok(Arc::new(SftpProvider::new(sftp_config)) as Arc<dyn ResourceProvider + Send + Sync>)
        }
    }
}

/// Select the provider for a resource scheme
///
/// Local paths always go through the filesystem provider; remote schemes
/// must match the scan provider.
///
/// # Errors
///
/// Returns a configuration error when no provider serves the scheme.
pub fn provider_for_scheme(
    scheme: Scheme,
    scan_provider: &Arc<dyn ResourceProvider + Send + Sync>,
) -> Result<Arc<dyn ResourceProvider + Send + Sync>> {
    if scheme == scan_provider.scheme() {
        return Ok(Arc::clone(scan_provider));
    }
    match scheme {
        Scheme::File => Ok(Arc::new(FileSystemProvider::new())),
        other => Err(StagerError::Configuration(format!(
            "No storage provider configured for '{other}' resources (storage backend is '{}')",
            scan_provider.scheme()
        ))),
    }
}
