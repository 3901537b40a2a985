//! YAML manifest strategy

use super::StudyResourceStrategy;
use crate::adapters::storage::ResourceProvider;
use crate::config::StrategyKind;
use crate::domain::{Resource, Result, StagerError, Study, StudyId};
use async_trait::async_trait;
use regex::Regex;
use serde_yaml::Value;
use std::sync::Arc;

/// Reads the most recent `<prefix>*.yaml|yml` manifest in the scan root
///
/// The manifest maps study ids to file paths relative to the scan root:
///
/// ```yaml
/// brca_tcga:
///   - brca_tcga/meta_study.txt
///   - brca_tcga/data_clinical.txt
/// ```
pub struct YamlManifestStrategy {
    provider: Arc<dyn ResourceProvider + Send + Sync>,
    pattern: Regex,
}

impl YamlManifestStrategy {
    /// # Errors
    ///
    /// Returns a configuration error if the prefix yields an invalid pattern.
    pub fn new(provider: Arc<dyn ResourceProvider + Send + Sync>, prefix: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(r"^{}.*\.(yaml|yml)$", regex::escape(prefix.trim())))
            .map_err(|e| StagerError::Configuration(format!("Invalid scan.yaml_prefix: {e}")))?;
        Ok(Self { provider, pattern })
    }

    /// Most recently modified manifest; equal times go to the greatest name
    fn find_manifest<'a>(&self, listing: &'a [Resource]) -> Option<&'a Resource> {
        listing
            .iter()
            .filter(|r| r.is_file() && self.pattern.is_match(r.filename()))
            .max_by(|a, b| {
                a.last_modified()
                    .cmp(&b.last_modified())
                    .then_with(|| a.filename().cmp(b.filename()))
            })
    }
}

/// Parses manifest text into `(study id, relative paths)` pairs, in file order
///
/// # Errors
///
/// Returns a resource collection error unless the document is a mapping of
/// strings to lists of strings.
pub fn parse_manifest(name: &str, content: &str) -> Result<Vec<(String, Vec<String>)>> {
    let shape_error = |detail: String| {
        StagerError::ResourceCollection(format!(
            "Manifest {name} must map study ids to lists of files: {detail}"
        ))
    };

    let document: Value = serde_yaml::from_str(content)
        .map_err(|e| StagerError::ResourceCollection(format!("Cannot parse manifest {name}: {e}")))?;

    let mapping = match document {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Err(shape_error("document is empty".to_string())),
        other => return Err(shape_error(format!("found {}", value_kind(&other)))),
    };

    let mut studies = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let study_id = match key {
            Value::String(s) => s,
            other => return Err(shape_error(format!("key is {}", value_kind(&other)))),
        };
        let files = match value {
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(shape_error(format!(
                        "entry of '{study_id}' is {}",
                        value_kind(&other)
                    ))),
                })
                .collect::<Result<Vec<String>>>()?,
            other => {
                return Err(shape_error(format!(
                    "value of '{study_id}' is {}",
                    value_kind(&other)
                )))
            }
        };
        studies.push((study_id, files));
    }
    Ok(studies)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[async_trait]
impl StudyResourceStrategy for YamlManifestStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Yaml
    }

    async fn resolve_resources(
        &self,
        scan_location: &Resource,
        listing: &[Resource],
        timestamp: &str,
    ) -> Result<Vec<Study>> {
        let manifest = self.find_manifest(listing).ok_or_else(|| {
            StagerError::ResourceCollection(format!(
                "No manifest matching '{}' found in {}",
                self.pattern, scan_location
            ))
        })?;
        tracing::info!(manifest = %manifest, "Using study manifest");

        let bytes = self.provider.read(manifest).await?;
        let content = String::from_utf8(bytes).map_err(|e| {
            StagerError::ResourceCollection(format!("Manifest {manifest} is not UTF-8: {e}"))
        })?;

        let mut studies = Vec::new();
        for (id, files) in parse_manifest(manifest.filename(), &content)? {
            if files.is_empty() {
                tracing::warn!(study_id = %id, "Manifest lists no files for study, skipping");
                continue;
            }
            let study_id = StudyId::new(id).map_err(|e| {
                StagerError::ResourceCollection(format!("Manifest {manifest}: {e}"))
            })?;
            let resources = files.iter().map(|f| scan_location.join(f)).collect();
            studies.push(Study::new(
                study_id,
                manifest.filename(),
                timestamp,
                resources,
            ));
        }

        Ok(studies)
    }
}
