// Stager - Scheduled study staging and loading
// Copyright (c) 2025 Stager Contributors
// Licensed under the MIT License

//! # Stager - Scheduled study staging and loading
//!
//! Stager watches a scan location on a local filesystem, S3 or SFTP server
//! for new study bundles, stages them locally and runs each one through
//! transformation, validation and loading into a downstream portal.
//!
//! ## Overview
//!
//! On every scan tick Stager:
//! - **Collects** pending studies with one of five resolution strategies
//! - **Filters** out resources it processed before (the ignore-set)
//! - **Extracts** study files into a working directory, with retries
//! - **Transforms, validates and loads** each study by running external tools
//! - **Publishes** logs and reports to a central share and reports a summary per study
//! - **Restarts** the portal once when anything was loaded
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (strategies, collection, staging, ETL, reporting, scanner)
//! - [`adapters`] - Storage backends and external processes
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stager::config::load_config;
//! use stager::core::scanner::{ScheduledScanner, TickOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("stager.toml")?;
//!     let scanner = ScheduledScanner::from_config(&config).await?;
//!
//!     if let TickOutcome::Processed(summary) = scanner.tick().await? {
//!         println!("Loaded {} studies", summary.loaded_count());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Study Resolution
//!
//! A strategy turns the listing of the scan location into studies:
//!
//! ```rust,no_run
//! use stager::adapters::storage::{FileSystemProvider, ResourceProvider};
//! use stager::core::strategy::{StudyDirStrategy, StudyResourceStrategy};
//! use stager::domain::{scan_timestamp, Resource};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider: Arc<dyn ResourceProvider + Send + Sync> = Arc::new(FileSystemProvider::new());
//! let location = Resource::parse("/data/incoming")?;
//! let listing = provider.list(&location).await?;
//!
//! let strategy = StudyDirStrategy::new(provider);
//! let studies = strategy
//!     .resolve_resources(&location, &listing, &scan_timestamp())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Stager uses the [`domain::StagerError`] type for all errors. Step failures of
//! a single study are recorded as [`domain::ExitStatus`] values instead and
//! never abort the batch.
//!
//! ```rust,no_run
//! use stager::domain::StagerError;
//!
//! fn example() -> Result<(), StagerError> {
//!     let config = stager::config::load_config("stager.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Stager uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(study_id = "brca_tcga", "Study extracted");
//! warn!(location = "/data/incoming", "No new studies found");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
