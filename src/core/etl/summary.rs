//! Per-study outcomes and the batch summary

use crate::core::staging::StudyArtifacts;
use crate::domain::{ExitStatus, Resource, Study, StudyId};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// What happened to one study in a batch
#[derive(Debug, Clone)]
pub struct StudyOutcome {
    pub study_id: StudyId,
    pub version: String,
    pub timestamp: String,

    /// Step statuses, `None` for steps that never ran
    pub transformation: Option<ExitStatus>,
    pub validation: Option<ExitStatus>,
    pub loading: Option<ExitStatus>,

    /// Log and report files of the study
    pub artifacts: StudyArtifacts,

    /// Copies on the central share
    pub published: Vec<Resource>,

    /// Why the pipeline stopped early, if it did
    pub error: Option<String>,

    /// An external process ended without an exit code
    pub indeterminate: bool,

    /// Scanned resources of the study
    pub resources: Vec<Resource>,
}

impl StudyOutcome {
    pub fn new(study: &Study, study_dir: &Path) -> Self {
        Self {
            study_id: study.study_id.clone(),
            version: study.version.clone(),
            timestamp: study.timestamp.clone(),
            transformation: None,
            validation: None,
            loading: None,
            artifacts: StudyArtifacts::for_study(study_dir, study),
            published: Vec::new(),
            error: None,
            indeterminate: false,
            resources: study.resources.clone(),
        }
    }

    /// The study reached the portal
    pub fn is_loaded(&self) -> bool {
        self.loading == Some(ExitStatus::Success)
    }

    /// The pipeline reached a final state for this study
    ///
    /// Studies whose outcome is unknown are scanned again next time.
    pub fn is_completed(&self) -> bool {
        !self.indeterminate
    }
}

/// Summary of one ETL batch
#[derive(Debug, Clone, Default)]
pub struct EtlSummary {
    pub outcomes: Vec<StudyOutcome>,

    /// Studies dropped during extraction, with the files that failed
    pub files_not_found: BTreeMap<StudyId, Vec<String>>,

    /// The portal was restarted after loading
    pub restarted: bool,

    /// Curators were granted access to the loaded studies
    pub authorized: bool,

    pub duration: Duration,

    /// Batch-level failures that did not abort the run
    pub errors: Vec<String>,
}

impl EtlSummary {
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn loaded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_loaded()).count()
    }

    pub fn loaded_study_ids(&self) -> Vec<StudyId> {
        self.outcomes
            .iter()
            .filter(|o| o.is_loaded())
            .map(|o| o.study_id.clone())
            .collect()
    }

    /// Resources of every study that reached a final state, passed or not
    pub fn completed_resources(&self) -> Vec<Resource> {
        self.outcomes
            .iter()
            .filter(|o| o.is_completed())
            .flat_map(|o| o.resources.iter().cloned())
            .collect()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            studies = self.outcomes.len(),
            loaded = self.loaded_count(),
            not_extracted = self.files_not_found.len(),
            restarted = self.restarted,
            authorized = self.authorized,
            duration_secs = self.duration.as_secs(),
            "ETL batch completed"
        );

        for outcome in &self.outcomes {
            tracing::info!(
                study_id = %outcome.study_id,
                transformation = ?outcome.transformation,
                validation = ?outcome.validation,
                loading = ?outcome.loading,
                published = outcome.published.len(),
                "Study outcome"
            );
        }

        if !self.errors.is_empty() {
            tracing::warn!(error_count = self.errors.len(), "ETL batch completed with errors");
            for error in &self.errors {
                tracing::warn!(message = %error, "ETL batch error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, loading: Option<ExitStatus>, indeterminate: bool) -> StudyOutcome {
        let study = Study::new(
            StudyId::new(id).unwrap(),
            "",
            "20240101-000000",
            vec![Resource::parse(&format!("/scan/{id}/meta_study.txt")).unwrap()],
        );
        let mut outcome = StudyOutcome::new(&study, Path::new("/work/20240101-000000").join(id).as_path());
        outcome.loading = loading;
        outcome.indeterminate = indeterminate;
        outcome
    }

    #[test]
    fn test_artifacts_next_to_study_dir() {
        let o = outcome("s1", None, false);
        assert_eq!(
            o.artifacts.loading_log,
            Path::new("/work/20240101-000000/s1_loading_log.txt")
        );
    }

    #[test]
    fn test_counts_and_completed_resources() {
        let summary = EtlSummary {
            outcomes: vec![
                outcome("s1", Some(ExitStatus::Success), false),
                outcome("s2", Some(ExitStatus::Error), false),
                outcome("s3", None, true),
            ],
            ..Default::default()
        };
        assert_eq!(summary.loaded_count(), 1);
        assert_eq!(summary.loaded_study_ids(), vec![StudyId::new("s1").unwrap()]);

        let completed = summary.completed_resources();
        assert_eq!(completed.len(), 2);
        assert!(completed.iter().all(|r| !r.path().contains("/s3/")));
    }
}
