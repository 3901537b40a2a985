//! Reporting of scan and ETL outcomes
//!
//! Every backend implements [`ReportingService`]. The pipeline talks to a
//! single [`DelegatingReporter`] which fans out to all enabled backends.

pub mod log;

pub use log::{LogFormat, LogReportingService};

use crate::config::StagerConfig;
use crate::core::etl::StudyOutcome;
use crate::domain::{Result, StagerError, StudyId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Receiver of scan and ETL outcomes
#[async_trait]
pub trait ReportingService: Send + Sync {
    /// Studies left out because some of their files could not be copied
    async fn report_study_file_not_found(
        &self,
        failed_studies: &BTreeMap<StudyId, Vec<String>>,
        retry_attempts: u32,
    ) -> Result<()>;

    /// Step statuses and artifacts of one processed study
    async fn report_summary(&self, outcome: &StudyOutcome) -> Result<()>;

    /// A failure that aborted a scan or a batch-level step
    async fn report_generic_error(&self, message: &str, error: Option<&StagerError>) -> Result<()>;
}

/// Fans every report out to all registered backends
///
/// All backends are tried; failures are logged and the first one is
/// returned.
#[derive(Default)]
pub struct DelegatingReporter {
    delegates: Vec<Arc<dyn ReportingService>>,
}

impl DelegatingReporter {
    pub fn new(delegates: Vec<Arc<dyn ReportingService>>) -> Self {
        Self { delegates }
    }

    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }

    fn first_failure(results: Vec<Result<()>>) -> Result<()> {
        let mut first = None;
        for result in results {
            if let Err(e) = result {
                crate::log_error_with_context!(&e, "Reporting backend failed");
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl ReportingService for DelegatingReporter {
    async fn report_study_file_not_found(
        &self,
        failed_studies: &BTreeMap<StudyId, Vec<String>>,
        retry_attempts: u32,
    ) -> Result<()> {
        let results = futures::future::join_all(
            self.delegates
                .iter()
                .map(|d| d.report_study_file_not_found(failed_studies, retry_attempts)),
        )
        .await;
        Self::first_failure(results)
    }

    async fn report_summary(&self, outcome: &StudyOutcome) -> Result<()> {
        let results =
            futures::future::join_all(self.delegates.iter().map(|d| d.report_summary(outcome)))
                .await;
        Self::first_failure(results)
    }

    async fn report_generic_error(&self, message: &str, error: Option<&StagerError>) -> Result<()> {
        let results = futures::future::join_all(
            self.delegates
                .iter()
                .map(|d| d.report_generic_error(message, error)),
        )
        .await;
        Self::first_failure(results)
    }
}

/// Creates the reporter for the enabled backends
///
/// With no backend enabled the reporter is empty and every report is a
/// no-op.
///
/// # Errors
///
/// Returns an error if the log-file backend cannot be initialized.
pub async fn create_reporter(config: &StagerConfig) -> Result<Arc<dyn ReportingService>> {
    let mut delegates: Vec<Arc<dyn ReportingService>> = Vec::new();

    if config.reporting.log_enabled {
        tracing::info!("Creating log file reporting backend");
        let service =
            LogReportingService::from_config(&config.reporting, &config.application.server_alias)
                .await?;
        delegates.push(Arc::new(service));
    }

    if delegates.is_empty() {
        tracing::warn!("No reporting backend enabled, outcomes are only logged");
    }
    Ok(Arc::new(DelegatingReporter::new(delegates)))
}
