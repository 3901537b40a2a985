//! Extract step: copy study files into the staging area

use crate::adapters::storage::ResourceProvider;
use crate::config::ScanConfig;
use crate::core::staging::directory::DirectoryCreator;
use crate::domain::{Resource, Result, StagerError, Study, StudyId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of extracting a batch of studies
#[derive(Debug, Default)]
pub struct ExtractionResult {
    /// Fully extracted studies, with their staging directory attached
    pub studies: Vec<Study>,

    /// Per study, the resources that could not be copied
    pub files_not_found: BTreeMap<StudyId, Vec<String>>,
}

/// Copies every study's resources into its extraction directory
pub struct Extractor {
    provider: Arc<dyn ResourceProvider + Send + Sync>,
    directories: Arc<DirectoryCreator>,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl Extractor {
    pub fn new(
        provider: Arc<dyn ResourceProvider + Send + Sync>,
        directories: Arc<DirectoryCreator>,
        retry_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            provider,
            directories,
            retry_attempts: retry_attempts.max(1),
            retry_delay,
        }
    }

    pub fn from_config(
        scan: &ScanConfig,
        provider: Arc<dyn ResourceProvider + Send + Sync>,
        directories: Arc<DirectoryCreator>,
    ) -> Self {
        Self::new(
            provider,
            directories,
            scan.retry_attempts,
            Duration::from_secs(scan.retry_delay_seconds),
        )
    }

    /// Extracts a batch of studies
    ///
    /// Files keep their directory structure relative to the deepest
    /// directory shared by all of the study's resources. A study with any
    /// file that could not be copied after all retries is left out of
    /// [`ExtractionResult::studies`] and listed in
    /// [`ExtractionResult::files_not_found`].
    ///
    /// # Errors
    ///
    /// Returns an error if an extraction directory cannot be created.
    pub async fn run(&self, studies: Vec<Study>) -> Result<ExtractionResult> {
        let mut result = ExtractionResult::default();

        for study in studies {
            let study_dir = self.directories.create_study_extract_dir(&study).await?;
            let base = common_base(&study.resources);

            let mut failed = Vec::new();
            for resource in &study.resources {
                let target = target_dir(&study_dir, base.as_ref(), resource);
                if let Err(e) = self.copy_with_retry(&target, resource).await {
                    tracing::error!(study_id = %study.study_id, resource = %resource, error = %e, "Could not extract file");
                    failed.push(resource.url());
                }
            }

            if failed.is_empty() {
                tracing::info!(
                    study_id = %study.study_id,
                    files = study.resources.len(),
                    dir = %study_dir.display(),
                    "Study extracted"
                );
                result.studies.push(study.with_study_dir(study_dir));
            } else {
                tracing::error!(
                    study_id = %study.study_id,
                    failed = failed.len(),
                    "Extraction finished with missing files"
                );
                result.files_not_found.insert(study.study_id.clone(), failed);
            }
        }

        Ok(result)
    }

    async fn copy_with_retry(&self, target: &Path, resource: &Resource) -> Result<Resource> {
        let mut attempt = 1;
        loop {
            match self.provider.copy_from_remote(target, resource).await {
                Ok(local) => {
                    tracing::debug!(resource = %resource, dest = %target.display(), "Copied resource");
                    return Ok(local);
                }
                Err(e) if attempt < self.retry_attempts => {
                    crate::log_retry_attempt!(attempt, self.retry_attempts, e);
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(StagerError::Extraction(format!(
                        "Cannot copy {resource} after {attempt} attempt(s): {e}"
                    )))
                }
            }
        }
    }
}

/// Deepest directory containing every resource
fn common_base(resources: &[Resource]) -> Option<Resource> {
    let mut base = resources.first()?.parent()?;
    while !resources.iter().all(|r| r.is_under(&base)) {
        base = base.parent()?;
    }
    Some(base)
}

fn target_dir(study_dir: &Path, base: Option<&Resource>, resource: &Resource) -> PathBuf {
    let relative_parent = base
        .and_then(|base| resource.parent().map(|parent| (base, parent)))
        .and_then(|(base, parent)| parent.relative_to(base).map(str::to_string))
        .unwrap_or_default();
    if relative_parent.is_empty() {
        study_dir.to_path_buf()
    } else {
        study_dir.join(relative_parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::FileSystemProvider;
    use crate::config::EtlConfig;
    use tempfile::TempDir;

    fn resources(urls: &[&str]) -> Vec<Resource> {
        urls.iter().map(|u| Resource::parse(u).unwrap()).collect()
    }

    fn extractor(working_dir: &Path) -> Extractor {
        let etl: EtlConfig =
            toml::from_str(&format!("working_dir = {:?}", working_dir.to_string_lossy())).unwrap();
        Extractor::new(
            Arc::new(FileSystemProvider::new()),
            Arc::new(DirectoryCreator::new(&etl).unwrap()),
            2,
            Duration::from_millis(1),
        )
    }

    #[test]
    fn test_common_base() {
        let base = common_base(&resources(&[
            "s3://b/scan/study/meta_study.txt",
            "s3://b/scan/study/case_lists/all.txt",
        ]))
        .unwrap();
        assert_eq!(base.url(), "s3://b/scan/study");

        let base = common_base(&resources(&["/scan/a/x.txt", "/scan/b/y.txt"])).unwrap();
        assert_eq!(base.path(), "/scan");
        assert!(common_base(&[]).is_none());
    }

    #[test]
    fn test_target_dir_preserves_structure() {
        let base = Resource::parse("/scan/study").unwrap();
        let nested = Resource::parse("/scan/study/case_lists/all.txt").unwrap();
        let top = Resource::parse("/scan/study/meta_study.txt").unwrap();

        assert_eq!(
            target_dir(Path::new("/work/s"), Some(&base), &nested),
            PathBuf::from("/work/s/case_lists")
        );
        assert_eq!(
            target_dir(Path::new("/work/s"), Some(&base), &top),
            PathBuf::from("/work/s")
        );
    }

    #[tokio::test]
    async fn test_run_copies_files() {
        let scan = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        std::fs::create_dir_all(scan.path().join("study_a/case_lists")).unwrap();
        std::fs::write(scan.path().join("study_a/meta_study.txt"), "m").unwrap();
        std::fs::write(scan.path().join("study_a/case_lists/all.txt"), "c").unwrap();

        let study = Study::new(
            StudyId::new("study_a").unwrap(),
            "",
            "20240101-000000",
            vec![
                Resource::from_local_path(&scan.path().join("study_a/meta_study.txt")),
                Resource::from_local_path(&scan.path().join("study_a/case_lists/all.txt")),
            ],
        );

        let result = extractor(work.path()).run(vec![study]).await.unwrap();
        assert!(result.files_not_found.is_empty());
        assert_eq!(result.studies.len(), 1);

        let dir = result.studies[0].study_dir().unwrap();
        assert_eq!(dir, work.path().join("20240101-000000/study_a"));
        assert!(dir.join("meta_study.txt").is_file());
        assert!(dir.join("case_lists/all.txt").is_file());
        // Resources still point at the scan location
        assert!(result.studies[0].resources[0].path().starts_with(&*scan.path().to_string_lossy()));
    }

    #[tokio::test]
    async fn test_missing_file_drops_study() {
        let scan = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        std::fs::create_dir_all(scan.path().join("study_a")).unwrap();
        std::fs::write(scan.path().join("study_a/present.txt"), "x").unwrap();

        let study = Study::new(
            StudyId::new("study_a").unwrap(),
            "",
            "20240101-000000",
            vec![
                Resource::from_local_path(&scan.path().join("study_a/present.txt")),
                Resource::from_local_path(&scan.path().join("study_a/absent.txt")),
            ],
        );

        let result = extractor(work.path()).run(vec![study]).await.unwrap();
        assert!(result.studies.is_empty());
        let missing = &result.files_not_found[&StudyId::new("study_a").unwrap()];
        assert_eq!(missing.len(), 1);
        assert!(missing[0].ends_with("absent.txt"));
    }
}
