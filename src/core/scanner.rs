//! Scheduled scanner
//!
//! Ticks on a fixed interval. Each tick collects pending studies, runs the
//! ETL pipeline on them and records the processed resources in the
//! ignore-set. Ticks never overlap: a tick that outlasts the interval delays
//! the next one.

use crate::adapters::process::{AdvisoryLock, CommandRunner, PortLock, ProcessRunner};
use crate::adapters::storage::{create_resource_provider, ResourceProvider};
use crate::config::StagerConfig;
use crate::core::etl::{EtlProcessRunner, EtlSummary};
use crate::core::report::{create_reporter, ReportingService};
use crate::core::resource::{IgnoreSet, ResourceCollector, ResourceFilter};
use crate::core::strategy::create_strategy;
use crate::domain::{Resource, Result, StagerError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::Instrument;
use uuid::Uuid;

/// Result of one tick
#[derive(Debug)]
pub enum TickOutcome {
    /// Nothing new at the scan location
    Idle,
    /// Studies were found and run through the pipeline
    Processed(EtlSummary),
}

/// Why the scan loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    IdleLimitReached,
    IterationsCompleted,
    Shutdown,
    Failed(String),
}

impl ScanOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            ScanOutcome::Failed(_) => 1,
            _ => 0,
        }
    }
}

/// Periodic driver of collection and ETL
pub struct ScheduledScanner {
    collector: ResourceCollector,
    runner: EtlProcessRunner,
    ignore: Arc<RwLock<IgnoreSet>>,
    reporter: Arc<dyn ReportingService>,
    scan_location: Resource,
    interval: Duration,
    iterations: Option<u64>,
    idle_limit: Option<u32>,
}

impl ScheduledScanner {
    /// Creates the scanner and all its collaborators from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any component cannot be set up.
    pub async fn from_config(config: &StagerConfig) -> Result<Self> {
        let provider = create_resource_provider(config).await?;
        let reporter = create_reporter(config).await?;
        let command_runner = Arc::new(ProcessRunner::new(
            config.etl.command_timeout_seconds.map(Duration::from_secs),
        ));
        let lock = Arc::new(PortLock::new(config.etl.lock_port));
        Self::with_components(config, provider, command_runner, reporter, lock)
    }

    /// Creates the scanner around the given backends
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings, or an error if
    /// the ignore file cannot be read.
    pub fn with_components(
        config: &StagerConfig,
        provider: Arc<dyn ResourceProvider + Send + Sync>,
        command_runner: Arc<dyn CommandRunner>,
        reporter: Arc<dyn ReportingService>,
        lock: Arc<dyn AdvisoryLock>,
    ) -> Result<Self> {
        let scan_location = config
            .scan
            .location_resource()
            .map_err(StagerError::Configuration)?;

        let ignore = Arc::new(RwLock::new(IgnoreSet::from_config(&config.scan)?));
        let strategy = create_strategy(&config.scan, provider.clone())?;
        let filter = ResourceFilter::from_config(&config.scan, ignore.clone());
        let collector = ResourceCollector::new(provider.clone(), strategy, filter);
        let runner =
            EtlProcessRunner::from_config(config, provider, command_runner, reporter.clone(), lock)?;

        Ok(Self {
            collector,
            runner,
            ignore,
            reporter,
            scan_location,
            interval: Duration::from_secs(config.scan.interval_seconds),
            iterations: config.scan.iterations,
            idle_limit: config.scan.idle_limit,
        })
    }

    /// Overrides the tick period
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Shared ignore-set of processed resources
    pub fn ignore_set(&self) -> Arc<RwLock<IgnoreSet>> {
        Arc::clone(&self.ignore)
    }

    /// Runs one scan
    ///
    /// # Errors
    ///
    /// Collection and pipeline failures are reported and returned; they end
    /// the scan loop.
    pub async fn tick(&self) -> Result<TickOutcome> {
        let studies = match self.collector.get_resources(Some(&self.scan_location)).await {
            Ok(studies) => studies,
            Err(e) => {
                self.report("Error during resource collection", &e).await;
                return Err(e);
            }
        };

        if studies.is_empty() {
            tracing::info!(location = %self.scan_location, "No new studies found");
            return Ok(TickOutcome::Idle);
        }

        let summary = match self.runner.run(studies).await {
            Ok(summary) => summary,
            Err(e) => {
                self.report("Error during the ETL process", &e).await;
                return Err(e);
            }
        };

        let completed = summary.completed_resources();
        let appended = match self.ignore.write().await.append_resources(&completed) {
            Ok(appended) => appended,
            Err(e) => {
                self.report("Cannot record processed resources in the ignore file", &e)
                    .await;
                return Err(e);
            }
        };
        tracing::info!(appended, "Processed resources added to the ignore-set");

        Ok(TickOutcome::Processed(summary))
    }

    async fn report(&self, message: &str, error: &StagerError) {
        crate::log_error_with_context!(error, message);
        if let Err(e) = self.reporter.report_generic_error(message, Some(error)).await {
            crate::log_error_with_context!(&e, "Failed to report error");
        }
    }

    /// Ticks until a stop condition is met
    ///
    /// Stops after `idle_limit` consecutive idle ticks, after `iterations`
    /// ticks, on the first failing tick, or when `shutdown` turns true. A
    /// running tick is never interrupted.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> ScanOutcome {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut listening = true;
        let mut ticks: u64 = 0;
        let mut idle_ticks: u32 = 0;

        tracing::info!(
            location = %self.scan_location,
            interval_secs = self.interval.as_secs(),
            "Scheduled scanner started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed(), if listening => {
                    if changed.is_err() {
                        // Sender gone, nothing can request a shutdown anymore
                        listening = false;
                    }
                    continue;
                }
            }
            if *shutdown.borrow() {
                tracing::info!(ticks, "Shutdown requested, stopping scanner");
                return ScanOutcome::Shutdown;
            }

            ticks += 1;
            let span = tracing::info_span!("scan", run_id = %Uuid::new_v4(), tick = ticks);
            match self.tick().instrument(span).await {
                Err(e) => return ScanOutcome::Failed(e.to_string()),
                Ok(TickOutcome::Idle) => {
                    idle_ticks += 1;
                    if self.idle_limit.is_some_and(|limit| idle_ticks >= limit) {
                        tracing::info!(idle_ticks, "Idle limit reached, stopping scanner");
                        return ScanOutcome::IdleLimitReached;
                    }
                }
                Ok(TickOutcome::Processed(_)) => idle_ticks = 0,
            }

            if self.iterations.is_some_and(|limit| ticks >= limit) {
                tracing::info!(ticks, "Iteration limit reached, stopping scanner");
                return ScanOutcome::IterationsCompleted;
            }
        }
    }
}
