//! Staging directory layout
//!
//! Two layouts are supported:
//! - `job`: `base/<timestamp>/<studyId>`
//! - `study`: `base/<studyId>/<version or timestamp>`
//!
//! The same layout is used for extraction, transformation and the central
//! share within one run.

use crate::config::{DirFormat, EtlConfig, VersionFormat};
use crate::domain::{Resource, Result, StagerError, Study};
use std::path::{Path, PathBuf};

/// Subdirectory used for transformed output when no transformation
/// directory is configured
pub const STAGING_SUBDIR: &str = "staging";

/// Computes and creates per-study staging directories
#[derive(Debug, Clone)]
pub struct DirectoryCreator {
    working_dir: PathBuf,
    transformation_dir: Option<PathBuf>,
    dir_format: DirFormat,
    version_format: VersionFormat,
}

impl DirectoryCreator {
    /// Creates the directory creator, checking the base directories first
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `etl.working_dir` is unset, missing
    /// or a file, or if `etl.transformation_dir` is set and is not a directory.
    pub fn new(etl: &EtlConfig) -> Result<Self> {
        let working_dir = etl.working_dir.trim();
        if working_dir.is_empty() {
            return Err(StagerError::Configuration(
                "etl.working_dir not defined. Please check the configuration.".to_string(),
            ));
        }
        let working_dir = PathBuf::from(working_dir);
        ensure_base_dir("etl.working_dir", &working_dir)?;

        let transformation_dir = match etl.transformation_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => {
                let dir = PathBuf::from(dir);
                ensure_base_dir("etl.transformation_dir", &dir)?;
                Some(dir)
            }
            _ => None,
        };

        Ok(Self {
            working_dir,
            transformation_dir,
            dir_format: etl.dir_format,
            version_format: etl.version_format,
        })
    }

    /// Layout path of a study below any base directory
    pub fn intermediate_path(&self, study: &Study) -> PathBuf {
        match self.dir_format {
            DirFormat::Job => Path::new(&study.timestamp).join(study.study_id.as_str()),
            DirFormat::Study => {
                let label = match self.version_format {
                    VersionFormat::Version => study.version_or_timestamp(),
                    VersionFormat::Timestamp => study.timestamp.as_str(),
                };
                Path::new(study.study_id.as_str()).join(label)
            }
        }
    }

    /// Extraction directory of a study, without touching the filesystem
    pub fn study_extract_dir(&self, study: &Study) -> PathBuf {
        self.working_dir.join(self.intermediate_path(study))
    }

    /// Creates the extraction directory of a study
    ///
    /// Idempotent: an existing directory is returned as is.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the working directory disappeared,
    /// or a directory creation error if the directory cannot be created.
    pub async fn create_study_extract_dir(&self, study: &Study) -> Result<PathBuf> {
        ensure_base_dir("etl.working_dir", &self.working_dir)?;
        let dir = self.study_extract_dir(study);
        create_dir(&dir).await?;
        Ok(dir)
    }

    /// Creates the directory receiving transformed output
    ///
    /// Without `etl.transformation_dir` this is `<untransformed>/staging`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn create_transformed_study_dir(
        &self,
        study: &Study,
        untransformed_dir: &Path,
    ) -> Result<PathBuf> {
        let dir = match self.transformation_dir {
            Some(ref base) => {
                ensure_base_dir("etl.transformation_dir", base)?;
                base.join(self.intermediate_path(study))
            }
            None => untransformed_dir.join(STAGING_SUBDIR),
        };
        create_dir(&dir).await?;
        Ok(dir)
    }

    /// Location of a study's artifacts on the central share
    pub fn central_share_location_path(&self, share_root: &Resource, study: &Study) -> Resource {
        share_root.join(&self.intermediate_path(study).to_string_lossy())
    }
}

fn ensure_base_dir(key: &str, dir: &Path) -> Result<()> {
    match std::fs::metadata(dir) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(StagerError::Configuration(format!(
            "{key} points to a file on the local file system, but should point to a directory: {}",
            dir.display()
        ))),
        Err(_) => Err(StagerError::Configuration(format!(
            "{key} does not exist on the local file system: {}",
            dir.display()
        ))),
    }
}

async fn create_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        StagerError::DirectoryCreation(format!("Cannot create {}: {}", dir.display(), e))
    })
}

/// Per-study log and report files, placed next to the extraction directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyArtifacts {
    pub transformation_log: PathBuf,
    pub validation_log: PathBuf,
    pub validation_report: PathBuf,
    pub loading_log: PathBuf,
}

impl StudyArtifacts {
    pub fn for_study(study_dir: &Path, study: &Study) -> Self {
        let parent = study_dir.parent().unwrap_or(study_dir);
        let id = study.study_id.as_str();
        Self {
            transformation_log: parent.join(format!("{id}_transformation_log.txt")),
            validation_log: parent.join(format!("{id}_validation_log.txt")),
            validation_report: parent.join(format!("{id}_validation_report.html")),
            loading_log: parent.join(format!("{id}_loading_log.txt")),
        }
    }

    /// Artifacts in publishing order
    pub fn all(&self) -> [&Path; 4] {
        [
            &self.transformation_log,
            &self.validation_log,
            &self.validation_report,
            &self.loading_log,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StudyId;
    use tempfile::TempDir;

    fn etl_config(working_dir: &Path) -> EtlConfig {
        toml::from_str(&format!("working_dir = {:?}", working_dir.to_string_lossy())).unwrap()
    }

    fn study(version: &str) -> Study {
        Study::new(
            StudyId::new("brca_tcga").unwrap(),
            version,
            "20240102-030405",
            vec![],
        )
    }

    #[test]
    fn test_rejects_missing_or_file_working_dir() {
        let dir = TempDir::new().unwrap();

        let missing = etl_config(&dir.path().join("absent"));
        let err = DirectoryCreator::new(&missing).unwrap_err();
        assert!(matches!(err, StagerError::Configuration(_)));
        assert!(err.to_string().contains("does not exist"));

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        let err = DirectoryCreator::new(&etl_config(&file)).unwrap_err();
        assert!(err.to_string().contains("should point to a directory"));

        let mut blank = etl_config(dir.path());
        blank.working_dir = " ".to_string();
        let err = DirectoryCreator::new(&blank).unwrap_err();
        assert!(err.to_string().contains("etl.working_dir not defined"));
    }

    #[test]
    fn test_layouts() {
        let dir = TempDir::new().unwrap();
        let mut config = etl_config(dir.path());

        let creator = DirectoryCreator::new(&config).unwrap();
        assert_eq!(
            creator.intermediate_path(&study("v1")),
            PathBuf::from("20240102-030405/brca_tcga")
        );

        config.dir_format = DirFormat::Study;
        let creator = DirectoryCreator::new(&config).unwrap();
        assert_eq!(
            creator.intermediate_path(&study("v1")),
            PathBuf::from("brca_tcga/v1")
        );
        assert_eq!(
            creator.intermediate_path(&study("")),
            PathBuf::from("brca_tcga/20240102-030405")
        );

        config.version_format = VersionFormat::Timestamp;
        let creator = DirectoryCreator::new(&config).unwrap();
        assert_eq!(
            creator.intermediate_path(&study("v1")),
            PathBuf::from("brca_tcga/20240102-030405")
        );
    }

    #[tokio::test]
    async fn test_create_study_extract_dir_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let creator = DirectoryCreator::new(&etl_config(dir.path())).unwrap();

        let first = creator.create_study_extract_dir(&study("v1")).await.unwrap();
        let second = creator.create_study_extract_dir(&study("v1")).await.unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
        assert_eq!(first, dir.path().join("20240102-030405/brca_tcga"));
    }

    #[tokio::test]
    async fn test_transformed_dir_defaults_to_staging() {
        let dir = TempDir::new().unwrap();
        let creator = DirectoryCreator::new(&etl_config(dir.path())).unwrap();
        let extract = creator.create_study_extract_dir(&study("v1")).await.unwrap();

        let transformed = creator
            .create_transformed_study_dir(&study("v1"), &extract)
            .await
            .unwrap();
        assert_eq!(transformed, extract.join("staging"));
        assert!(transformed.is_dir());
    }

    #[tokio::test]
    async fn test_transformed_dir_uses_configured_base() {
        let work = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let mut config = etl_config(work.path());
        config.transformation_dir = Some(out.path().to_string_lossy().into_owned());
        let creator = DirectoryCreator::new(&config).unwrap();

        let transformed = creator
            .create_transformed_study_dir(&study("v1"), work.path())
            .await
            .unwrap();
        assert_eq!(transformed, out.path().join("20240102-030405/brca_tcga"));
    }

    #[test]
    fn test_central_share_path_follows_layout() {
        let dir = TempDir::new().unwrap();
        let creator = DirectoryCreator::new(&etl_config(dir.path())).unwrap();
        let share = Resource::parse("s3://bucket/share").unwrap();

        let path = creator.central_share_location_path(&share, &study("v1"));
        assert_eq!(path.url(), "s3://bucket/share/20240102-030405/brca_tcga");
    }

    #[test]
    fn test_artifact_names() {
        let artifacts =
            StudyArtifacts::for_study(Path::new("/work/20240102-030405/brca_tcga"), &study("v1"));
        assert_eq!(
            artifacts.validation_report,
            PathBuf::from("/work/20240102-030405/brca_tcga_validation_report.html")
        );
        assert_eq!(artifacts.all().len(), 4);
    }
}
