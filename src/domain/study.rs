//! Study: the unit of work flowing through the pipeline

use crate::domain::resource::Resource;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Format of the scan-time stamp attached to every study (`yyyyMMdd-HHmmss`)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Returns the current local wall-clock time as a scan timestamp
pub fn scan_timestamp() -> String {
    format_timestamp(Local::now())
}

/// Formats a wall-clock time as a scan timestamp
pub fn format_timestamp(time: DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Study identifier newtype wrapper
///
/// # Examples
///
/// ```
/// use stager::domain::StudyId;
/// use std::str::FromStr;
///
/// let id = StudyId::from_str("brca_tcga").unwrap();
/// assert_eq!(id.as_str(), "brca_tcga");
/// assert!(StudyId::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudyId(String);

impl StudyId {
    /// Creates a new StudyId, rejecting blank values
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Study ID cannot be empty".to_string());
        }
        Ok(Self(id.trim().to_string()))
    }

    /// Returns the study ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for StudyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StudyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for StudyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One logical dataset discovered by a scan
///
/// Created by a resolution strategy, mutated only to attach the staging
/// directory once extraction has placed its files locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Study {
    pub study_id: StudyId,
    pub version: String,
    pub timestamp: String,
    pub resources: Vec<Resource>,
    study_dir: Option<PathBuf>,
}

impl Study {
    pub fn new(
        study_id: StudyId,
        version: impl Into<String>,
        timestamp: impl Into<String>,
        resources: Vec<Resource>,
    ) -> Self {
        Self {
            study_id,
            version: version.into(),
            timestamp: timestamp.into(),
            resources,
            study_dir: None,
        }
    }

    /// Attaches the local extraction directory
    pub fn with_study_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.study_dir = Some(dir.into());
        self
    }

    /// Local extraction directory, set once the study has been extracted
    pub fn study_dir(&self) -> Option<&Path> {
        self.study_dir.as_deref()
    }

    /// Version when one was derived, else the scan timestamp
    pub fn version_or_timestamp(&self) -> &str {
        if self.version.is_empty() {
            &self.timestamp
        } else {
            &self.version
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_study_id_trims_and_rejects_blank() {
        assert_eq!(StudyId::new(" lgg_ucsf ").unwrap().as_str(), "lgg_ucsf");
        assert!(StudyId::new("").is_err());
        assert!(StudyId::from_str("\t").is_err());
    }

    #[test]
    fn test_format_timestamp() {
        let time = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(format_timestamp(time), "20240307-090501");
    }

    #[test]
    fn test_scan_timestamp_shape() {
        let stamp = scan_timestamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'-');
    }

    #[test]
    fn test_study_dir_attachment() {
        let study = Study::new(
            StudyId::new("study_a").unwrap(),
            "",
            "20240101-000000",
            vec![Resource::parse("/scan/study_a/data.txt").unwrap()],
        );
        assert!(study.study_dir().is_none());
        assert_eq!(study.version_or_timestamp(), "20240101-000000");

        let study = study.with_study_dir("/work/20240101-000000/study_a");
        assert_eq!(
            study.study_dir(),
            Some(Path::new("/work/20240101-000000/study_a"))
        );
    }

    #[test]
    fn test_version_or_timestamp_prefers_version() {
        let study = Study::new(StudyId::new("s").unwrap(), "v2", "20240101-000000", vec![]);
        assert_eq!(study.version_or_timestamp(), "v2");
    }
}
