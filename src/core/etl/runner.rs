//! ETL process runner
//!
//! Drives every study of a batch through extract, transform, validate and
//! load, one study at a time. A study that fails a step stops there; its
//! siblings continue. Artifacts are published and a summary is reported for
//! every study, and the portal is restarted once if anything was loaded.

use crate::adapters::process::{AdvisoryLock, CommandRunner};
use crate::adapters::storage::ResourceProvider;
use crate::config::StagerConfig;
use crate::core::etl::authorizer::Authorizer;
use crate::core::etl::commands::create_command_builder;
use crate::core::etl::loader::Loader;
use crate::core::etl::restarter::Restarter;
use crate::core::etl::summary::{EtlSummary, StudyOutcome};
use crate::core::etl::transformer::Transformer;
use crate::core::etl::validator::Validator;
use crate::core::report::ReportingService;
use crate::core::staging::{DirectoryCreator, Extractor, Publisher};
use crate::domain::{ExitStatus, Result, StagerError, Study, ValidationLevel};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Runs the ETL pipeline for a batch of studies
pub struct EtlProcessRunner {
    lock: Arc<dyn AdvisoryLock>,
    directories: Arc<DirectoryCreator>,
    extractor: Extractor,
    transformer: Transformer,
    validator: Validator,
    loader: Loader,
    restarter: Restarter,
    authorizer: Authorizer,
    publisher: Publisher,
    reporter: Arc<dyn ReportingService>,
    validation_level: ValidationLevel,
    retry_attempts: u32,
}

impl EtlProcessRunner {
    /// Creates the runner from its collaborators
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid directories, validation
    /// level, portal mode or share location.
    pub fn from_config(
        config: &StagerConfig,
        provider: Arc<dyn ResourceProvider + Send + Sync>,
        command_runner: Arc<dyn CommandRunner>,
        reporter: Arc<dyn ReportingService>,
        lock: Arc<dyn AdvisoryLock>,
    ) -> Result<Self> {
        let validation_level = config.etl.validation_level.parse::<ValidationLevel>()?;
        let directories = Arc::new(DirectoryCreator::new(&config.etl)?);
        let builder = create_command_builder(&config.portal)?;
        let share = config
            .etl
            .central_share_resource()
            .map_err(StagerError::Configuration)?;

        Ok(Self {
            lock,
            extractor: Extractor::from_config(&config.scan, provider.clone(), directories.clone()),
            publisher: Publisher::new(share, &provider, directories.clone())?,
            directories,
            transformer: Transformer::new(command_runner.clone(), config.transformation.clone()),
            validator: Validator::new(command_runner.clone(), builder.clone()),
            loader: Loader::new(command_runner.clone(), builder.clone()),
            restarter: Restarter::new(command_runner.clone(), builder),
            authorizer: Authorizer::new(command_runner, &config.authorization, &config.portal),
            reporter,
            validation_level,
            retry_attempts: config.scan.retry_attempts,
        })
    }

    /// Processes a batch of studies
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is held elsewhere or a staging directory
    /// cannot be created. Failures of individual studies are part of the
    /// returned summary instead.
    pub async fn run(&self, studies: Vec<Study>) -> Result<EtlSummary> {
        let start_time = Instant::now();
        let _guard = self.lock.acquire()?;
        self.validator.reset().await;

        tracing::info!(studies = studies.len(), "Starting ETL process");
        let mut summary = EtlSummary::default();

        let extraction = self.extractor.run(studies).await?;
        if !extraction.files_not_found.is_empty() {
            if let Err(e) = self
                .reporter
                .report_study_file_not_found(&extraction.files_not_found, self.retry_attempts)
                .await
            {
                crate::log_error_with_context!(&e, "Failed to report missing study files");
            }
        }
        summary.files_not_found = extraction.files_not_found;

        for study in &extraction.studies {
            let mut outcome = self.process_study(study).await;

            match self.publisher.publish(study, &outcome.artifacts.all()).await {
                Ok(published) => outcome.published = published,
                Err(e) => {
                    crate::log_error_with_context!(&e, "Failed to publish study artifacts");
                    summary.errors.push(e.to_string());
                }
            }

            if let Err(e) = self.reporter.report_summary(&outcome).await {
                crate::log_error_with_context!(&e, "Failed to report study summary");
            }
            if outcome.indeterminate {
                let message = format!(
                    "The outcome of study {} is unknown, it will be processed again: {}",
                    outcome.study_id,
                    outcome.error.as_deref().unwrap_or_default()
                );
                self.report_error(&message, None).await;
            }

            summary.outcomes.push(outcome);
        }

        if summary.loaded_count() > 0 {
            self.finish_loading(&mut summary).await;
        }

        let summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    /// Restarts the portal once, then authorizes the loaded studies
    async fn finish_loading(&self, summary: &mut EtlSummary) {
        if let Err(e) = self.restarter.restart().await {
            self.report_error("Restarting the portal failed", Some(&e)).await;
            summary.errors.push(e.to_string());
            return;
        }
        summary.restarted = true;

        match self.authorizer.authorize(&summary.loaded_study_ids()).await {
            Ok(()) => summary.authorized = self.authorizer.is_enabled(),
            Err(e) => {
                self.report_error("Authorizing the loaded studies failed", Some(&e)).await;
                summary.errors.push(e.to_string());
            }
        }
    }

    async fn report_error(&self, message: &str, error: Option<&StagerError>) {
        tracing::error!(context = message, error = ?error.map(ToString::to_string), "Reporting error");
        if let Err(e) = self.reporter.report_generic_error(message, error).await {
            crate::log_error_with_context!(&e, "Failed to report error");
        }
    }

    async fn process_study(&self, study: &Study) -> StudyOutcome {
        let study_dir: PathBuf = study
            .study_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.directories.study_extract_dir(study));
        let mut outcome = StudyOutcome::new(study, &study_dir);

        if let Err(e) = self.run_steps(study, &study_dir, &mut outcome).await {
            crate::log_error_with_context!(&e, "Study pipeline stopped");
            outcome.indeterminate = e.is_indeterminate();
            outcome.error = Some(e.to_string());
        }
        outcome
    }

    async fn run_steps(&self, study: &Study, study_dir: &Path, outcome: &mut StudyOutcome) -> Result<()> {
        let artifacts = outcome.artifacts.clone();
        let study_id = &study.study_id;

        let transformed_dir = if self.transformer.skips() {
            study_dir.to_path_buf()
        } else {
            self.directories
                .create_transformed_study_dir(study, study_dir)
                .await
                .map_err(|e| failed(&mut outcome.transformation, e))?
        };

        let transformation = self
            .transformer
            .transform(study_dir, &transformed_dir, &artifacts.transformation_log)
            .await
            .map_err(|e| failed(&mut outcome.transformation, e))?;
        outcome.transformation = Some(transformation);
        crate::log_study_step!(study_id, "transformation", transformation);
        if !transformation.advances() {
            return Ok(());
        }

        let ready_dir = if transformation == ExitStatus::Skipped {
            study_dir
        } else {
            transformed_dir.as_path()
        };

        let validation = self
            .validator
            .validate(ready_dir, &artifacts.validation_report, &artifacts.validation_log)
            .await
            .map_err(|e| failed(&mut outcome.validation, e))?;
        outcome.validation = Some(validation);
        crate::log_study_step!(study_id, "validation", validation);
        if !self.validation_level.passes(validation) {
            tracing::warn!(study_id = %study_id, status = %validation, "Study did not pass validation, not loading");
            return Ok(());
        }

        let loading = self
            .loader
            .load(ready_dir, &artifacts.loading_log)
            .await
            .map_err(|e| failed(&mut outcome.loading, e))?;
        outcome.loading = Some(loading);
        crate::log_study_step!(study_id, "loading", loading);
        Ok(())
    }
}

/// Records a step error as ERROR unless the outcome is unknown
fn failed(slot: &mut Option<ExitStatus>, error: StagerError) -> StagerError {
    if !error.is_indeterminate() {
        *slot = Some(ExitStatus::Error);
    }
    error
}
