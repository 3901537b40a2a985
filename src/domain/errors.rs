//! Domain error types
//!
//! This module defines the error hierarchy for Stager.
//! All errors are domain-specific and don't expose third-party SDK types.

use thiserror::Error;

/// Main Stager error type
///
/// This is the primary error type used throughout the application.
/// Per-study step outcomes are carried as [`crate::domain::ExitStatus`] values;
/// this type is reserved for failures that abort an operation.
#[derive(Debug, Error)]
pub enum StagerError {
    /// Missing or invalid settings, always fatal to the current operation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Listing, manifest or backend failures while discovering studies
    #[error("Resource collection error: {0}")]
    ResourceCollection(String),

    /// Staging directory could not be computed or created
    #[error("Directory creation error: {0}")]
    DirectoryCreation(String),

    /// Copying study files into the staging area failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// External process could not be run to completion
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// A pipeline step failed before producing an exit status
    #[error("{step} step failed: {message}")]
    Step { step: String, message: String },

    /// Copying artifacts to the central share failed
    #[error("Publish error: {0}")]
    Publish(String),

    /// A reporting backend failed to deliver
    #[error("Report error: {0}")]
    Report(String),

    /// The advisory lock is held by another instance
    #[error("Lock error: {0}")]
    Lock(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl StagerError {
    /// Builds a [`StagerError::Step`] for the named pipeline step
    pub fn step(step: impl Into<String>, message: impl Into<String>) -> Self {
        StagerError::Step {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Whether the error leaves the outcome of an external process unknown
    ///
    /// Studies failing this way are not recorded as processed, so they are
    /// picked up again on the next scan.
    pub fn is_indeterminate(&self) -> bool {
        matches!(
            self,
            StagerError::Command(
                CommandError::Interrupted { .. } | CommandError::TimedOut { .. }
            )
        )
    }
}

/// External process errors
///
/// A process that ran and returned a non-zero exit code is not an error here;
/// it is mapped to an exit status by the owning service.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process could not be started
    #[error("Failed to start '{program}': {message}")]
    Spawn { program: String, message: String },

    /// The process terminated without an exit code (e.g. killed by a signal)
    #[error("'{program}' was interrupted before reporting an exit code")]
    Interrupted { program: String },

    /// The process exceeded the configured timeout and was killed
    #[error("'{program}' timed out after {seconds}s")]
    TimedOut { program: String, seconds: u64 },

    /// Log redirection or waiting on the process failed
    #[error("I/O failure while running '{program}': {message}")]
    Io { program: String, message: String },
}

// Conversion from std::io::Error
impl From<std::io::Error> for StagerError {
    fn from(err: std::io::Error) -> Self {
        StagerError::Io(err.to_string())
    }
}

// Conversion from serde_yaml::Error
impl From<serde_yaml::Error> for StagerError {
    fn from(err: serde_yaml::Error) -> Self {
        StagerError::Serialization(format!("YAML parse error: {err}"))
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for StagerError {
    fn from(err: toml::de::Error) -> Self {
        StagerError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stager_error_display() {
        let err = StagerError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_step_error_display() {
        let err = StagerError::step("Validation", "Dump portalInfo step failed");
        assert_eq!(
            err.to_string(),
            "Validation step failed: Dump portalInfo step failed"
        );
    }

    #[test]
    fn test_command_error_conversion() {
        let cmd_err = CommandError::Interrupted {
            program: "validateData.py".to_string(),
        };
        let err: StagerError = cmd_err.into();
        assert!(matches!(err, StagerError::Command(_)));
        assert!(err.is_indeterminate());
    }

    #[test]
    fn test_spawn_error_is_not_indeterminate() {
        let err: StagerError = CommandError::Spawn {
            program: "missing".to_string(),
            message: "No such file or directory".to_string(),
        }
        .into();
        assert!(!err.is_indeterminate());
        assert!(err.to_string().contains("Failed to start 'missing'"));
    }

    #[test]
    fn test_timeout_is_indeterminate() {
        let err: StagerError = CommandError::TimedOut {
            program: "cbioportalImporter.py".to_string(),
            seconds: 30,
        }
        .into();
        assert!(err.is_indeterminate());
        assert!(err.to_string().contains("timed out after 30s"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: StagerError = io_err.into();
        assert!(matches!(err, StagerError::Io(_)));
    }

    #[test]
    fn test_serde_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("a: [unclosed").unwrap_err();
        let err: StagerError = yaml_err.into();
        assert!(err.to_string().contains("YAML parse error"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: StagerError = toml_err.into();
        assert!(matches!(err, StagerError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_stager_error_implements_std_error() {
        let err = StagerError::ResourceCollection("Test error".to_string());
        // Verify it implements std::error::Error
        let _: &dyn std::error::Error = &err;
    }
}
