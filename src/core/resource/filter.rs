//! Resource filtering applied after study resolution

use crate::config::{ScanConfig, StrategyKind};
use crate::core::resource::ignore::IgnoreSet;
use crate::domain::{Resource, Study};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Removes processed resources and applies the extract-folder allow-list
pub struct ResourceFilter {
    ignore: Arc<RwLock<IgnoreSet>>,
    allow_list: Vec<String>,
}

impl ResourceFilter {
    /// Creates a filter
    ///
    /// Folder names are normalized: trailing `/` and `*` are stripped and
    /// blank entries dropped. An empty allow-list admits everything.
    pub fn new(ignore: Arc<RwLock<IgnoreSet>>, folders: Vec<String>) -> Self {
        let allow_list = folders
            .iter()
            .map(|f| normalize_folder(f))
            .filter(|f| !f.is_empty())
            .collect();
        Self { ignore, allow_list }
    }

    /// Creates the filter for a scan configuration
    ///
    /// With the `definedversion` strategy the extract folders name the study
    /// rather than subfolders, so no allow-list is applied.
    pub fn from_config(scan: &ScanConfig, ignore: Arc<RwLock<IgnoreSet>>) -> Self {
        let folders = match scan.strategy {
            StrategyKind::DefinedVersion => Vec::new(),
            _ => scan.folder_names(),
        };
        Self::new(ignore, folders)
    }

    /// Filters the resources of every study
    ///
    /// Studies left without resources are dropped.
    pub async fn filter(&self, scan_location: &Resource, studies: Vec<Study>) -> Vec<Study> {
        let ignore = self.ignore.read().await;
        let mut kept = Vec::with_capacity(studies.len());

        for mut study in studies {
            let before = study.resources.len();
            study.resources.retain(|resource| {
                !ignore.contains(resource) && self.is_allowed(scan_location, resource)
            });

            if study.resources.is_empty() {
                tracing::debug!(study_id = %study.study_id, "Study dropped, no pending resources");
                continue;
            }
            if study.resources.len() < before {
                tracing::debug!(
                    study_id = %study.study_id,
                    removed = before - study.resources.len(),
                    remaining = study.resources.len(),
                    "Filtered study resources"
                );
            }
            kept.push(study);
        }

        kept
    }

    fn is_allowed(&self, scan_location: &Resource, resource: &Resource) -> bool {
        if self.allow_list.is_empty() {
            return true;
        }
        self.allow_list
            .iter()
            .any(|folder| folder_matches(scan_location, folder, resource))
    }
}

fn normalize_folder(folder: &str) -> String {
    folder
        .trim()
        .trim_end_matches(['/', '*'])
        .to_string()
}

/// Absolute and URL entries match by prefix; bare names are relative to the
/// scan location
fn folder_matches(scan_location: &Resource, folder: &str, resource: &Resource) -> bool {
    if folder.contains("://") || folder.starts_with("file:") || folder.starts_with('/') {
        return match Resource::parse(folder) {
            Ok(base) => resource.is_under(&base),
            Err(_) => false,
        };
    }

    let folder = folder.trim_start_matches("./");
    match resource.relative_to(scan_location) {
        Some(relative) => relative == folder || relative.starts_with(&format!("{folder}/")),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StudyId;

    fn study(id: &str, files: &[&str]) -> Study {
        Study::new(
            StudyId::new(id).unwrap(),
            "",
            "20240101-000000",
            files.iter().map(|f| Resource::parse(f).unwrap()).collect(),
        )
    }

    fn ignore_with(urls: &[&str]) -> Arc<RwLock<IgnoreSet>> {
        let mut set = IgnoreSet::in_memory();
        let resources: Vec<Resource> = urls.iter().map(|u| Resource::parse(u).unwrap()).collect();
        set.append_resources(&resources).unwrap();
        Arc::new(RwLock::new(set))
    }

    #[test]
    fn test_normalize_folder() {
        assert_eq!(normalize_folder(" study_a/* "), "study_a");
        assert_eq!(normalize_folder("study_b//"), "study_b");
        assert_eq!(normalize_folder("*"), "");
    }

    #[tokio::test]
    async fn test_fully_ignored_study_is_dropped() {
        let scan = Resource::parse("/scan").unwrap();
        let filter = ResourceFilter::new(
            ignore_with(&["/scan/a/1.txt", "/scan/a/2.txt", "/scan/b/1.txt"]),
            vec![],
        );
        let studies = vec![
            study("a", &["/scan/a/1.txt", "/scan/a/2.txt"]),
            study("b", &["/scan/b/1.txt", "/scan/b/2.txt"]),
        ];

        let kept = filter.filter(&scan, studies).await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].study_id.as_str(), "b");
        assert_eq!(kept[0].resources.len(), 1);
        assert_eq!(kept[0].resources[0].filename(), "2.txt");
    }

    #[tokio::test]
    async fn test_allow_list_restricts_resources() {
        let scan = Resource::parse("s3://bucket/scan").unwrap();
        let filter = ResourceFilter::new(
            ignore_with(&[]),
            vec!["a/*".to_string(), "s3://bucket/scan/c/".to_string()],
        );
        let studies = vec![
            study("a", &["s3://bucket/scan/a/1.txt"]),
            study("ab", &["s3://bucket/scan/ab/1.txt"]),
            study("c", &["s3://bucket/scan/c/x/1.txt"]),
        ];

        let kept = filter.filter(&scan, studies).await;
        let ids: Vec<&str> = kept.iter().map(|s| s.study_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_defined_version_ignores_allow_list() {
        let scan_config: ScanConfig = toml::from_str(
            r#"
            location = "/scan/study/v1"
            strategy = "definedversion"
            extract_folders = ["brca"]
            "#,
        )
        .unwrap();
        let filter = ResourceFilter::from_config(&scan_config, ignore_with(&[]));
        let scan = Resource::parse("/scan/study/v1").unwrap();

        let kept = filter
            .filter(&scan, vec![study("brca", &["/scan/study/v1/data.txt"])])
            .await;
        assert_eq!(kept.len(), 1);
    }
}
