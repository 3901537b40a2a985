//! Study resolution strategies
//!
//! A strategy turns the one-level listing of the scan location into
//! [`Study`] units. Which layout convention applies is chosen once from
//! `scan.strategy`:
//!
//! - [`YamlManifestStrategy`] - a manifest lists every study's files
//! - [`StudyDirStrategy`] - one subdirectory per study
//! - [`VersionDirStrategy`] - one subdirectory per study, newest version subdirectory wins
//! - [`DefinedVersionStrategy`] - the scan location is one version of a configured study
//! - [`VersionDefinedStrategy`] - the scan location is `<studyId>/<version>`
//!
//! Every strategy is all-or-nothing: any listing or manifest failure fails
//! the whole call, and no study is emitted without resources.

pub mod defined;
pub mod study_dir;
pub mod version_dir;
pub mod yaml;

pub use defined::{DefinedVersionStrategy, VersionDefinedStrategy};
pub use study_dir::StudyDirStrategy;
pub use version_dir::VersionDirStrategy;
pub use yaml::YamlManifestStrategy;

use crate::adapters::storage::ResourceProvider;
use crate::config::{ScanConfig, StrategyKind};
use crate::domain::{Resource, Result, StagerError, Study};
use async_trait::async_trait;
use std::sync::Arc;

/// Resolves a flat listing into studies
#[async_trait]
pub trait StudyResourceStrategy: Send + Sync {
    /// Strategy selector this implementation answers to
    fn kind(&self) -> StrategyKind;

    /// Resolves studies from the scan location listing
    ///
    /// # Arguments
    ///
    /// * `scan_location` - Resolved scan root
    /// * `listing` - Immediate children of the scan root
    /// * `timestamp` - Scan timestamp stamped on every study
    ///
    /// # Errors
    ///
    /// Returns a resource collection error on any listing, read or parse
    /// failure; no partial result is returned.
    async fn resolve_resources(
        &self,
        scan_location: &Resource,
        listing: &[Resource],
        timestamp: &str,
    ) -> Result<Vec<Study>>;
}

/// Creates the strategy selected by the scan configuration
///
/// # Errors
///
/// Returns a configuration error if the strategy's settings are incomplete.
pub fn create_strategy(
    scan: &ScanConfig,
    provider: Arc<dyn ResourceProvider + Send + Sync>,
) -> Result<Arc<dyn StudyResourceStrategy>> {
    tracing::info!(strategy = %scan.strategy, "Creating study resolution strategy");
    let strategy: Arc<dyn StudyResourceStrategy> = match scan.strategy {
        StrategyKind::Yaml => Arc::new(YamlManifestStrategy::new(provider, &scan.yaml_prefix)?),
        StrategyKind::StudyDir => Arc::new(StudyDirStrategy::new(provider)),
        StrategyKind::VersionDir => Arc::new(VersionDirStrategy::new(provider)),
        StrategyKind::DefinedVersion => {
            let folders = scan.folder_names();
            let study_id = match folders.as_slice() {
                [single] => single.clone(),
                [] => {
                    return Err(StagerError::Configuration(
                        "scan.extract_folders must name the study for the definedversion strategy"
                            .to_string(),
                    ))
                }
                _ => {
                    return Err(StagerError::Configuration(format!(
                        "scan.extract_folders contains more than one value: {}",
                        folders.join(",")
                    )))
                }
            };
            Arc::new(DefinedVersionStrategy::new(provider, study_id)?)
        }
        StrategyKind::VersionDefined => Arc::new(VersionDefinedStrategy::new(provider)),
    };
    Ok(strategy)
}

/// Last path segment of a directory resource, as a name usable for ids
pub(crate) fn dir_name(dir: &Resource) -> Result<&str> {
    let name = dir.filename();
    if name.is_empty() {
        return Err(StagerError::ResourceCollection(format!(
            "Cannot derive a name from {dir}"
        )));
    }
    Ok(name)
}
