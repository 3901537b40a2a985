//! Validate step

use crate::adapters::process::CommandRunner;
use crate::core::etl::commands::CommandBuilder;
use crate::domain::{ExitStatus, Result, StagerError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

const STEP: &str = "Validation";

/// Directory receiving the portal metadata dump, next to the studies
pub const PORTAL_INFO_DIR: &str = "portalInfo";

/// Validates staged studies against the portal's metadata
///
/// The metadata is dumped once per run, before the first study is validated.
pub struct Validator {
    runner: Arc<dyn CommandRunner>,
    builder: Arc<dyn CommandBuilder>,
    portal_info: Mutex<Option<PathBuf>>,
}

impl Validator {
    pub fn new(runner: Arc<dyn CommandRunner>, builder: Arc<dyn CommandBuilder>) -> Self {
        Self {
            runner,
            builder,
            portal_info: Mutex::new(None),
        }
    }

    /// Forgets the metadata dump so the next run refreshes it
    pub async fn reset(&self) {
        *self.portal_info.lock().await = None;
    }

    /// Validates one study
    ///
    /// # Errors
    ///
    /// Returns a step error if the portal metadata cannot be dumped, and a
    /// command error if the validator cannot be run to completion.
    pub async fn validate(
        &self,
        study_dir: &Path,
        report_file: &Path,
        log_file: &Path,
    ) -> Result<ExitStatus> {
        let portal_info = self.portal_info_dir(study_dir, log_file).await?;

        if self.builder.precreates_report_files() {
            create_empty(report_file).await?;
        }

        let spec = self
            .builder
            .validator_command(study_dir, &portal_info, report_file)
            .log_to(log_file);
        tracing::info!(command = %spec, "Starting validation");
        let code = self.runner.run(&spec).await?;
        Ok(ExitStatus::from_exit_code(code))
    }

    async fn portal_info_dir(&self, study_dir: &Path, log_file: &Path) -> Result<PathBuf> {
        let mut cached = self.portal_info.lock().await;
        if let Some(ref dir) = *cached {
            return Ok(dir.clone());
        }

        let dir = study_dir
            .parent()
            .unwrap_or(study_dir)
            .join(PORTAL_INFO_DIR);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StagerError::DirectoryCreation(format!("Cannot create {}: {}", dir.display(), e))
        })?;

        let spec = self.builder.portal_info_command(&dir).log_to(log_file);
        tracing::info!(command = %spec, "Dumping portal info");
        let code = self.runner.run(&spec).await?;
        if code != 0 {
            return Err(StagerError::step(STEP, "Dump portalInfo step failed"));
        }

        *cached = Some(dir.clone());
        Ok(dir)
    }
}

async fn create_empty(file: &Path) -> Result<()> {
    if let Some(parent) = file.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::process::CommandSpec;
    use crate::core::etl::commands::{ComposeCommandBuilder, LocalCommandBuilder};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    /// Replies with queued exit codes, then 0
    #[derive(Default)]
    struct ScriptedRunner {
        codes: StdMutex<VecDeque<i32>>,
        seen: StdMutex<Vec<String>>,
    }

    impl ScriptedRunner {
        fn with_codes(codes: &[i32]) -> Self {
            Self {
                codes: StdMutex::new(codes.iter().copied().collect()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<i32> {
            self.seen.lock().unwrap().push(spec.program.clone());
            Ok(self.codes.lock().unwrap().pop_front().unwrap_or(0))
        }
    }

    #[tokio::test]
    async fn test_portal_info_dumped_once() {
        let work = TempDir::new().unwrap();
        let study_dir = work.path().join("job/study_a");
        std::fs::create_dir_all(&study_dir).unwrap();

        let runner = Arc::new(ScriptedRunner::with_codes(&[0, 3, 0]));
        let validator = Validator::new(runner.clone(), Arc::new(LocalCommandBuilder::new("/opt/portal")));

        let report = work.path().join("job/study_a_validation_report.html");
        let log = work.path().join("job/study_a_validation_log.txt");
        assert_eq!(
            validator.validate(&study_dir, &report, &log).await.unwrap(),
            ExitStatus::Warning
        );
        assert_eq!(
            validator.validate(&study_dir, &report, &log).await.unwrap(),
            ExitStatus::Success
        );

        let seen = runner.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec!["./dumpPortalInfo.pl", "./validateData.py", "./validateData.py"]
        );
        assert!(work.path().join("job/portalInfo").is_dir());
    }

    #[tokio::test]
    async fn test_failed_portal_info_is_step_error() {
        let work = TempDir::new().unwrap();
        let study_dir = work.path().join("study_a");
        std::fs::create_dir_all(&study_dir).unwrap();

        let validator = Validator::new(
            Arc::new(ScriptedRunner::with_codes(&[1])),
            Arc::new(LocalCommandBuilder::new("/opt/portal")),
        );
        let err = validator
            .validate(&study_dir, &work.path().join("r.html"), &work.path().join("v.log"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Dump portalInfo step failed"));
    }

    #[tokio::test]
    async fn test_compose_precreates_report() {
        let work = TempDir::new().unwrap();
        let study_dir = work.path().join("study_a");
        std::fs::create_dir_all(&study_dir).unwrap();
        let report = work.path().join("study_a_validation_report.html");

        let validator = Validator::new(
            Arc::new(ScriptedRunner::default()),
            Arc::new(ComposeCommandBuilder::new("cbioportal", work.path(), vec![])),
        );
        validator
            .validate(&study_dir, &report, &work.path().join("v.log"))
            .await
            .unwrap();
        assert!(report.is_file());
    }
}
