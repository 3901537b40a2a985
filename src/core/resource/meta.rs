//! `meta_study.txt` marker handling

use crate::adapters::storage::ResourceProvider;
use crate::domain::{Resource, Result, StagerError, StudyId};

/// Marker file describing a study
pub const META_STUDY_FILE: &str = "meta_study.txt";

/// Key holding the study identifier inside the marker file
pub const STUDY_ID_KEY: &str = "cancer_study_identifier";

/// Whether the resource is a study marker file
pub fn is_meta_study(resource: &Resource) -> bool {
    resource.filename().ends_with(META_STUDY_FILE)
}

/// Extracts the study identifier from marker file content
///
/// Lines are `key: value`, split on the first colon. Returns `None` when the
/// key is absent or its value is blank.
pub fn parse_meta_study(content: &str) -> Option<String> {
    content
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == STUDY_ID_KEY)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Resolves the study id for a set of study files
///
/// The first marker file carrying an identifier wins; otherwise the id is
/// `fallback` (usually the study folder name).
///
/// # Errors
///
/// Returns a resource collection error if a marker cannot be read, or if
/// neither the marker nor the fallback yields a non-blank id.
pub async fn resolve_study_id(
    provider: &dyn ResourceProvider,
    files: &[Resource],
    fallback: &str,
) -> Result<StudyId> {
    for marker in files.iter().filter(|r| is_meta_study(r)) {
        let bytes = provider.read(marker).await?;
        let content = String::from_utf8_lossy(&bytes);
        if let Some(id) = parse_meta_study(&content) {
            tracing::debug!(marker = %marker, study_id = %id, "Study id read from marker");
            return StudyId::new(id).map_err(StagerError::ResourceCollection);
        }
    }

    StudyId::new(fallback).map_err(|e| {
        StagerError::ResourceCollection(format!("{e} (no usable {META_STUDY_FILE} either)"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::FileSystemProvider;
    use tempfile::TempDir;

    #[test]
    fn test_parse_meta_study() {
        let content = "type_of_cancer: brca\ncancer_study_identifier : brca_tcga_pub \nname: BRCA: TCGA\n";
        assert_eq!(parse_meta_study(content), Some("brca_tcga_pub".to_string()));
    }

    #[test]
    fn test_parse_meta_study_missing_or_blank() {
        assert_eq!(parse_meta_study("name: x\nno colon here"), None);
        assert_eq!(parse_meta_study("cancer_study_identifier:   "), None);
    }

    #[test]
    fn test_is_meta_study() {
        assert!(is_meta_study(&Resource::parse("/s/meta_study.txt").unwrap()));
        assert!(is_meta_study(&Resource::parse("/s/brca_meta_study.txt").unwrap()));
        assert!(!is_meta_study(&Resource::parse("/s/meta_clinical.txt").unwrap()));
    }

    #[tokio::test]
    async fn test_resolve_study_id_prefers_marker() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("meta_study.txt");
        std::fs::write(&marker, "cancer_study_identifier: lgg_ucsf_2014\n").unwrap();
        let files = vec![Resource::from_local_path(&marker)];

        let id = resolve_study_id(&FileSystemProvider::new(), &files, "folder")
            .await
            .unwrap();
        assert_eq!(id.as_str(), "lgg_ucsf_2014");
    }

    #[tokio::test]
    async fn test_resolve_study_id_falls_back_to_folder() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("meta_study.txt");
        std::fs::write(&marker, "name: no id here\n").unwrap();
        let files = vec![Resource::from_local_path(&marker)];

        let id = resolve_study_id(&FileSystemProvider::new(), &files, "folder")
            .await
            .unwrap();
        assert_eq!(id.as_str(), "folder");
    }
}
