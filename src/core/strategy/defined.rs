//! Single-study strategies where the scan location is one study version

use super::{dir_name, StudyResourceStrategy};
use crate::adapters::storage::ResourceProvider;
use crate::config::StrategyKind;
use crate::domain::{Resource, Result, StagerError, Study, StudyId};
use async_trait::async_trait;
use std::sync::Arc;

/// The scan location is a version of a study named in configuration
///
/// Resources are every file under the scan location, subdirectories
/// included; the version is the scan location's last path segment.
pub struct DefinedVersionStrategy {
    provider: Arc<dyn ResourceProvider + Send + Sync>,
    study_id: StudyId,
}

impl DefinedVersionStrategy {
    /// # Errors
    ///
    /// Returns a configuration error for a blank study id.
    pub fn new(
        provider: Arc<dyn ResourceProvider + Send + Sync>,
        study_id: impl Into<String>,
    ) -> Result<Self> {
        let study_id = StudyId::new(study_id).map_err(StagerError::Configuration)?;
        Ok(Self { provider, study_id })
    }
}

#[async_trait]
impl StudyResourceStrategy for DefinedVersionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DefinedVersion
    }

    async fn resolve_resources(
        &self,
        scan_location: &Resource,
        _listing: &[Resource],
        timestamp: &str,
    ) -> Result<Vec<Study>> {
        let files = self.provider.list_with(scan_location, true, true).await?;
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let version = dir_name(scan_location)?;
        Ok(vec![Study::new(
            self.study_id.clone(),
            version,
            timestamp,
            files,
        )])
    }
}

/// The scan location is `<studyId>/<version>`, listed recursively
pub struct VersionDefinedStrategy {
    provider: Arc<dyn ResourceProvider + Send + Sync>,
}

impl VersionDefinedStrategy {
    pub fn new(provider: Arc<dyn ResourceProvider + Send + Sync>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl StudyResourceStrategy for VersionDefinedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::VersionDefined
    }

    async fn resolve_resources(
        &self,
        scan_location: &Resource,
        _listing: &[Resource],
        timestamp: &str,
    ) -> Result<Vec<Study>> {
        let version = dir_name(scan_location)?;
        let study_id = scan_location
            .parent()
            .as_ref()
            .and_then(|parent| dir_name(parent).ok().map(str::to_string))
            .ok_or_else(|| {
                StagerError::ResourceCollection(format!(
                    "Scan location {scan_location} must be <studyId>/<version>"
                ))
            })?;
        let study_id = StudyId::new(study_id).map_err(StagerError::ResourceCollection)?;

        let files = self.provider.list_with(scan_location, true, true).await?;
        if files.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Study::new(study_id, version, timestamp, files)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::FileSystemProvider;
    use tempfile::TempDir;

    fn layout() -> TempDir {
        let dir = TempDir::new().unwrap();
        let version = dir.path().join("brca_tcga/2024-05");
        std::fs::create_dir_all(version.join("case_lists")).unwrap();
        std::fs::write(version.join("meta_study.txt"), "x").unwrap();
        std::fs::write(version.join("case_lists/all.txt"), "x").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_defined_version_uses_configured_id() {
        let dir = layout();
        let provider: Arc<dyn ResourceProvider + Send + Sync> = Arc::new(FileSystemProvider::new());
        let root = Resource::from_local_path(&dir.path().join("brca_tcga/2024-05"));
        let listing = provider.list(&root).await.unwrap();

        let studies = DefinedVersionStrategy::new(provider, "brca_custom")
            .unwrap()
            .resolve_resources(&root, &listing, "20240101-120000")
            .await
            .unwrap();

        assert_eq!(studies.len(), 1);
        assert_eq!(studies[0].study_id.as_str(), "brca_custom");
        assert_eq!(studies[0].version, "2024-05");
        // Files in subdirectories belong to the study too
        let names: Vec<&str> = studies[0].resources.iter().map(Resource::filename).collect();
        assert_eq!(studies[0].resources.len(), 2);
        assert!(names.contains(&"meta_study.txt"));
        assert!(names.contains(&"all.txt"));
    }

    #[tokio::test]
    async fn test_version_defined_reads_id_from_path() {
        let dir = layout();
        let provider: Arc<dyn ResourceProvider + Send + Sync> = Arc::new(FileSystemProvider::new());
        let root = Resource::from_local_path(&dir.path().join("brca_tcga/2024-05"));
        let listing = provider.list(&root).await.unwrap();

        let studies = VersionDefinedStrategy::new(provider)
            .resolve_resources(&root, &listing, "20240101-120000")
            .await
            .unwrap();

        assert_eq!(studies.len(), 1);
        assert_eq!(studies[0].study_id.as_str(), "brca_tcga");
        assert_eq!(studies[0].version, "2024-05");
        assert_eq!(studies[0].resources.len(), 2);
    }

    #[test]
    fn test_blank_defined_id_is_rejected() {
        assert!(matches!(
            DefinedVersionStrategy::new(Arc::new(FileSystemProvider::new()), " "),
            Err(StagerError::Configuration(_))
        ));
    }
}
