//! Core business logic for Stager.
//!
//! # Modules
//!
//! - [`strategy`] - Turning a scan listing into studies
//! - [`resource`] - Collection, filtering and the ignore-set
//! - [`staging`] - Staging directories, extraction and publishing
//! - [`etl`] - Transform, validate and load, per study
//! - [`report`] - Reporting backends
//! - [`scanner`] - The scheduled driver
//!
//! # Scan Workflow
//!
//! 1. **Collect**: list the scan location and resolve studies with the configured strategy
//! 2. **Filter**: drop resources already in the ignore-set or outside the extract folders
//! 3. **Extract**: copy study files into the working directory
//! 4. **Transform, Validate, Load**: one study at a time, stopping a study at its first failure
//! 5. **Publish and Report**: artifacts go to the central share, a summary per study to the reporters
//! 6. **Restart**: once per batch, when anything was loaded
//! 7. **Remember**: processed resources are appended to the ignore-set
//!
//! # Example
//!
//! ```rust,no_run
//! use stager::config::load_config;
//! use stager::core::scanner::ScheduledScanner;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("stager.toml")?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let scanner = ScheduledScanner::from_config(&config).await?;
//! let outcome = scanner.run(shutdown_rx).await;
//!
//! println!("Scanner stopped: {:?}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod etl;
pub mod report;
pub mod resource;
pub mod scanner;
pub mod staging;
pub mod strategy;
