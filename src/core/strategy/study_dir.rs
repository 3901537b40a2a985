//! Folder-per-study strategy

use super::{dir_name, StudyResourceStrategy};
use crate::adapters::storage::ResourceProvider;
use crate::config::StrategyKind;
use crate::core::resource::meta::resolve_study_id;
use crate::domain::{Resource, Result, Study};
use async_trait::async_trait;
use std::sync::Arc;

/// Every subdirectory of the scan root is one study
pub struct StudyDirStrategy {
    provider: Arc<dyn ResourceProvider + Send + Sync>,
}

impl StudyDirStrategy {
    pub fn new(provider: Arc<dyn ResourceProvider + Send + Sync>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl StudyResourceStrategy for StudyDirStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StudyDir
    }

    async fn resolve_resources(
        &self,
        _scan_location: &Resource,
        listing: &[Resource],
        timestamp: &str,
    ) -> Result<Vec<Study>> {
        let mut studies = Vec::new();

        for study_dir in listing.iter().filter(|r| r.is_dir()) {
            let files = self.provider.list_with(study_dir, true, true).await?;
            if files.is_empty() {
                tracing::debug!(dir = %study_dir, "Study directory is empty, skipping");
                continue;
            }

            let study_id =
                resolve_study_id(self.provider.as_ref(), &files, dir_name(study_dir)?).await?;
            tracing::debug!(study_id = %study_id, dir = %study_dir, files = files.len(), "Resolved study");
            studies.push(Study::new(study_id, "", timestamp, files));
        }

        Ok(studies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::FileSystemProvider;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_each_directory_is_a_study() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("study_a/case_lists")).unwrap();
        std::fs::write(dir.path().join("study_a/data.txt"), "x").unwrap();
        std::fs::write(dir.path().join("study_a/case_lists/all.txt"), "x").unwrap();
        std::fs::create_dir_all(dir.path().join("folder_b")).unwrap();
        std::fs::write(
            dir.path().join("folder_b/meta_study.txt"),
            "cancer_study_identifier: brca_b\n",
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        std::fs::write(dir.path().join("stray.txt"), "x").unwrap();

        let provider: Arc<dyn ResourceProvider + Send + Sync> = Arc::new(FileSystemProvider::new());
        let root = Resource::from_local_path(dir.path());
        let listing = provider.list(&root).await.unwrap();

        let studies = StudyDirStrategy::new(provider)
            .resolve_resources(&root, &listing, "20240101-120000")
            .await
            .unwrap();

        let ids: Vec<&str> = studies.iter().map(|s| s.study_id.as_str()).collect();
        assert_eq!(ids, vec!["brca_b", "study_a"]);
        assert_eq!(studies[1].resources.len(), 2);
        assert!(studies[1].resources.iter().all(|r| r.is_file()));
        assert_eq!(studies[1].version_or_timestamp(), "20240101-120000");
    }
}
