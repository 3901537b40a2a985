//! Step outcomes and the validation threshold

use crate::domain::errors::StagerError;
use crate::domain::result::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exit code external tools use to signal warnings
pub const WARNING_EXIT_CODE: i32 = 3;

/// Normalized outcome of one pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExitStatus {
    Success,
    Warning,
    Error,
    Skipped,
}

impl ExitStatus {
    /// Maps a process exit code: 0 is success, 3 is warning, anything else error
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => ExitStatus::Success,
            WARNING_EXIT_CODE => ExitStatus::Warning,
            _ => ExitStatus::Error,
        }
    }

    /// Maps a process exit code for steps without a warning state
    pub fn from_binary_exit_code(code: i32) -> Self {
        if code == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::Error
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitStatus::Success => "SUCCESS",
            ExitStatus::Warning => "WARNINGS",
            ExitStatus::Error => "ERRORS",
            ExitStatus::Skipped => "SKIPPED",
        }
    }

    /// Whether the pipeline may continue past this step
    pub fn advances(&self) -> bool {
        !matches!(self, ExitStatus::Error)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowest validation outcome that still blocks loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationLevel {
    /// Only errors block; warnings are tolerated
    Error,
    /// Warnings block as well
    Warning,
}

impl ValidationLevel {
    /// Whether a study with this validation outcome may be loaded
    pub fn passes(&self, status: ExitStatus) -> bool {
        match (self, status) {
            (_, ExitStatus::Success) => true,
            (ValidationLevel::Error, ExitStatus::Warning) => true,
            _ => false,
        }
    }
}

impl FromStr for ValidationLevel {
    type Err = StagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Ok(ValidationLevel::Error),
            "WARNING" => Ok(ValidationLevel::Warning),
            _ => Err(StagerError::Configuration(format!(
                "Invalid validation level '{s}'. Must be one of: ERROR, WARNING"
            ))),
        }
    }
}

/// Pass/fail predicate applied after validation
///
/// # Errors
///
/// Returns a configuration error for an unrecognized level string.
pub fn has_study_passed(level: &str, status: ExitStatus) -> Result<bool> {
    Ok(level.parse::<ValidationLevel>()?.passes(status))
}
