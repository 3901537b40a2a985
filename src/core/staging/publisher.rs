//! Publish step: copy study artifacts to the central share

use crate::adapters::storage::{provider_for_scheme, ResourceProvider};
use crate::core::staging::directory::DirectoryCreator;
use crate::domain::{Resource, Result, StagerError, Study};
use std::path::Path;
use std::sync::Arc;

/// Copies logs and reports of a study to `etl.central_share_location`
pub struct Publisher {
    target: Option<(Resource, Arc<dyn ResourceProvider + Send + Sync>)>,
    directories: Arc<DirectoryCreator>,
}

impl Publisher {
    /// Creates a publisher for an optional share location
    ///
    /// Local shares use the filesystem provider; remote shares must use the
    /// scan backend.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no provider serves the share scheme.
    pub fn new(
        share: Option<Resource>,
        scan_provider: &Arc<dyn ResourceProvider + Send + Sync>,
        directories: Arc<DirectoryCreator>,
    ) -> Result<Self> {
        let target = match share {
            Some(share) => {
                let provider = provider_for_scheme(share.scheme(), scan_provider)?;
                Some((share, provider))
            }
            None => None,
        };
        Ok(Self {
            target,
            directories,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Publishes the artifacts of one study
    ///
    /// Artifacts that were never written (a step that did not run) are
    /// skipped.
    ///
    /// # Returns
    ///
    /// The published copies, empty when no share is configured.
    ///
    /// # Errors
    ///
    /// Returns [`StagerError::Publish`] on the first copy that fails.
    pub async fn publish(&self, study: &Study, artifacts: &[&Path]) -> Result<Vec<Resource>> {
        let Some((ref share, ref provider)) = self.target else {
            tracing::info!(study_id = %study.study_id, "No central share location configured, skipping publish");
            return Ok(Vec::new());
        };

        let dest = self.directories.central_share_location_path(share, study);
        let mut published = Vec::new();

        for artifact in artifacts {
            if !tokio::fs::try_exists(artifact).await.unwrap_or(false) {
                tracing::debug!(artifact = %artifact.display(), "Artifact not produced, not publishing");
                continue;
            }
            let copy = provider.copy_to_remote(&dest, artifact).await.map_err(|e| {
                StagerError::Publish(format!(
                    "Cannot publish {} to {}: {}",
                    artifact.display(),
                    dest,
                    e
                ))
            })?;
            published.push(copy);
        }

        tracing::info!(
            study_id = %study.study_id,
            published = published.len(),
            dest = %dest,
            "Published study artifacts"
        );
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::FileSystemProvider;
    use crate::config::EtlConfig;
    use crate::domain::StudyId;
    use tempfile::TempDir;

    fn directories(working_dir: &Path) -> Arc<DirectoryCreator> {
        let etl: EtlConfig =
            toml::from_str(&format!("working_dir = {:?}", working_dir.to_string_lossy())).unwrap();
        Arc::new(DirectoryCreator::new(&etl).unwrap())
    }

    fn study() -> Study {
        Study::new(StudyId::new("study_a").unwrap(), "", "20240101-000000", vec![])
    }

    #[tokio::test]
    async fn test_publish_copies_existing_artifacts() {
        let work = TempDir::new().unwrap();
        let share = TempDir::new().unwrap();
        let log = work.path().join("study_a_loading_log.txt");
        std::fs::write(&log, "loaded").unwrap();
        let absent = work.path().join("study_a_validation_report.html");

        let scan: Arc<dyn ResourceProvider + Send + Sync> = Arc::new(FileSystemProvider::new());
        let publisher = Publisher::new(
            Some(Resource::from_local_path(share.path())),
            &scan,
            directories(work.path()),
        )
        .unwrap();

        let published = publisher
            .publish(&study(), &[log.as_path(), absent.as_path()])
            .await
            .unwrap();
        assert_eq!(published.len(), 1);
        let copied = share
            .path()
            .join("20240101-000000/study_a/study_a_loading_log.txt");
        assert_eq!(std::fs::read_to_string(copied).unwrap(), "loaded");
    }

    #[tokio::test]
    async fn test_publish_without_share_is_noop() {
        let work = TempDir::new().unwrap();
        let scan: Arc<dyn ResourceProvider + Send + Sync> = Arc::new(FileSystemProvider::new());
        let publisher = Publisher::new(None, &scan, directories(work.path())).unwrap();
        assert!(!publisher.is_enabled());
        assert!(publisher.publish(&study(), &[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_remote_share_needs_matching_backend() {
        let work = TempDir::new().unwrap();
        let scan: Arc<dyn ResourceProvider + Send + Sync> = Arc::new(FileSystemProvider::new());
        let result = Publisher::new(
            Some(Resource::parse("s3://bucket/share").unwrap()),
            &scan,
            directories(work.path()),
        );
        assert!(matches!(result, Err(StagerError::Configuration(_))));
    }
}
