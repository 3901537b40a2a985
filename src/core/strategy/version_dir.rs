//! Folder-per-study strategy with version subdirectories

use super::{dir_name, StudyResourceStrategy};
use crate::adapters::storage::ResourceProvider;
use crate::config::StrategyKind;
use crate::core::resource::meta::resolve_study_id;
use crate::domain::{Resource, Result, Study};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Every subdirectory of the scan root is a study; only its most recent
/// version subdirectory is processed
pub struct VersionDirStrategy {
    provider: Arc<dyn ResourceProvider + Send + Sync>,
}

impl VersionDirStrategy {
    pub fn new(provider: Arc<dyn ResourceProvider + Send + Sync>) -> Self {
        Self { provider }
    }

    /// Picks the version directory with the latest modification time
    ///
    /// Directories without a time of their own (S3 prefixes) take the latest
    /// time of the files beneath them. Equal times go to the greatest name.
    async fn most_recent_version(&self, study_dir: &Resource) -> Result<Option<Resource>> {
        let versions: Vec<Resource> = self
            .provider
            .list(study_dir)
            .await?
            .into_iter()
            .filter(Resource::is_dir)
            .collect();

        let mut best: Option<(Option<DateTime<Utc>>, Resource)> = None;
        for version in versions {
            let modified = match version.last_modified() {
                Some(time) => Some(time),
                None => self
                    .provider
                    .list_with(&version, true, true)
                    .await?
                    .iter()
                    .filter_map(Resource::last_modified)
                    .max(),
            };

            let newer = match best {
                None => true,
                Some((ref best_time, ref best_dir)) => {
                    (modified, version.filename()) > (*best_time, best_dir.filename())
                }
            };
            if newer {
                best = Some((modified, version));
            }
        }

        Ok(best.map(|(_, dir)| dir))
    }
}

#[async_trait]
impl StudyResourceStrategy for VersionDirStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::VersionDir
    }

    async fn resolve_resources(
        &self,
        _scan_location: &Resource,
        listing: &[Resource],
        timestamp: &str,
    ) -> Result<Vec<Study>> {
        let mut studies = Vec::new();

        for study_dir in listing.iter().filter(|r| r.is_dir()) {
            let Some(version_dir) = self.most_recent_version(study_dir).await? else {
                tracing::debug!(dir = %study_dir, "No version directories, skipping");
                continue;
            };

            let files = self.provider.list_with(&version_dir, true, true).await?;
            if files.is_empty() {
                tracing::debug!(dir = %version_dir, "Version directory is empty, skipping");
                continue;
            }

            let study_id =
                resolve_study_id(self.provider.as_ref(), &files, dir_name(study_dir)?).await?;
            let version = dir_name(&version_dir)?.to_string();
            tracing::info!(study_id = %study_id, version = %version, "Using most recent study version");
            studies.push(Study::new(study_id, version, timestamp, files));
        }

        Ok(studies)
    }
}
