//! Scan command implementation
//!
//! This module implements the `scan` command, which runs the scheduled
//! scanner until an idle limit, an iteration limit, a failure or a shutdown
//! signal stops it.

use crate::config::load_config;
use crate::core::scanner::{ScanOutcome, ScheduledScanner, TickOutcome};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Run a single scan and exit
    #[arg(long)]
    pub once: bool,

    /// Override the scan location
    #[arg(long)]
    pub location: Option<String>,

    /// Override the idle-tick limit
    #[arg(long)]
    pub idle_limit: Option<u32>,
}

impl ScanArgs {
    /// Execute the scan command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting scan command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("{e}");
                return Ok(2); // Configuration error exit code
            }
        };

        if let Some(location) = &self.location {
            tracing::info!(location = %location, "Overriding scan location from CLI");
            config.scan.location = location.clone();
        }
        if let Some(limit) = self.idle_limit {
            tracing::info!(idle_limit = limit, "Overriding idle limit from CLI");
            config.scan.idle_limit = Some(limit);
        }

        // Overrides bypass the loader's validation
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let scanner = match ScheduledScanner::from_config(&config).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create scanner");
                eprintln!("Failed to initialize scanner: {e}");
                return Ok(2);
            }
        };

        println!("🔎 Scanning {} ({})", config.scan.location, config.scan.strategy);
        println!();

        if self.once {
            return Ok(match scanner.tick().await {
                Ok(TickOutcome::Idle) => {
                    println!("✅ No new studies found");
                    0
                }
                Ok(TickOutcome::Processed(summary)) => {
                    println!("📊 ETL Summary:");
                    println!("  Studies: {}", summary.outcomes.len());
                    println!("  Loaded: {}", summary.loaded_count());
                    println!("  Not extracted: {}", summary.files_not_found.len());
                    println!("  Portal restarted: {}", summary.restarted);
                    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
                    for outcome in &summary.outcomes {
                        println!(
                            "  - {}: transformation {}, validation {}, loading {}",
                            outcome.study_id,
                            status_label(outcome.transformation),
                            status_label(outcome.validation),
                            status_label(outcome.loading),
                        );
                    }
                    if !summary.errors.is_empty() {
                        println!("⚠️  Errors encountered:");
                        for error in &summary.errors {
                            println!("  - {error}");
                        }
                    }
                    println!();
                    0
                }
                Err(e) => {
                    eprintln!("❌ Scan failed: {e}");
                    1
                }
            });
        }

        let outcome = scanner.run(shutdown_signal).await;
        match &outcome {
            ScanOutcome::IdleLimitReached => println!("✅ Idle limit reached, stopping"),
            ScanOutcome::IterationsCompleted => println!("✅ Iteration limit reached, stopping"),
            ScanOutcome::Shutdown => println!("⚠️  Scanner stopped by shutdown signal"),
            ScanOutcome::Failed(message) => eprintln!("❌ Scan failed: {message}"),
        }
        Ok(outcome.exit_code())
    }
}

fn status_label(status: Option<crate::domain::ExitStatus>) -> String {
    status.map_or_else(|| "-".to_string(), |s| s.to_string())
}
