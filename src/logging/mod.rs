//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - JSON-formatted file logs with rotation
//! - Configurable log levels
//! - Helper macros for the fields the pipeline logs repeatedly
//!
//! # Example
//!
//! ```no_run
//! use stager::logging::init_logging;
//! use stager::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the outcome of a pipeline step for one study
///
/// # Example
///
/// ```no_run
/// use stager::log_study_step;
/// use stager::domain::{ExitStatus, StudyId};
///
/// let study_id = StudyId::new("brca_tcga").unwrap();
/// log_study_step!(&study_id, "validation", ExitStatus::Warning);
/// ```
#[macro_export]
macro_rules! log_study_step {
    ($study_id:expr, $step:expr, $status:expr) => {
        tracing::info!(
            study_id = %$study_id,
            step = $step,
            status = %$status,
            "Study step finished"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use stager::log_error_with_context;
/// use stager::domain::StagerError;
///
/// let error = StagerError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use stager::log_retry_attempt;
///
/// log_retry_attempt!(2, 5, "Connection reset");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
