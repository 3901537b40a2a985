//! Pending-study collection for one scan

use crate::adapters::storage::ResourceProvider;
use crate::core::resource::filter::ResourceFilter;
use crate::core::strategy::StudyResourceStrategy;
use crate::domain::{scan_timestamp, Resource, Result, StagerError, Study};
use std::collections::HashSet;
use std::sync::Arc;

/// Composes provider, strategy and filter into "all pending studies"
pub struct ResourceCollector {
    provider: Arc<dyn ResourceProvider + Send + Sync>,
    strategy: Arc<dyn StudyResourceStrategy>,
    filter: ResourceFilter,
}

impl ResourceCollector {
    pub fn new(
        provider: Arc<dyn ResourceProvider + Send + Sync>,
        strategy: Arc<dyn StudyResourceStrategy>,
        filter: ResourceFilter,
    ) -> Self {
        Self {
            provider,
            strategy,
            filter,
        }
    }

    /// Collects the studies pending at a scan location
    ///
    /// Lists the location one level deep, resolves studies with the
    /// configured strategy, then drops processed and excluded resources.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no location is given, and a
    /// resource collection error for listing or resolution failures or when
    /// two studies share an id.
    pub async fn get_resources(&self, scan_location: Option<&Resource>) -> Result<Vec<Study>> {
        let scan_location = scan_location.ok_or_else(|| {
            StagerError::Configuration("Scan location is not defined".to_string())
        })?;

        tracing::info!(location = %scan_location, strategy = %self.strategy.kind(), "Scanning for studies");

        let listing = self.provider.list(scan_location).await?;
        let timestamp = scan_timestamp();
        let studies = self
            .strategy
            .resolve_resources(scan_location, &listing, &timestamp)
            .await?;

        let mut seen = HashSet::new();
        for study in &studies {
            if !seen.insert(study.study_id.clone()) {
                return Err(StagerError::ResourceCollection(format!(
                    "Study id '{}' resolved more than once in {}",
                    study.study_id, scan_location
                )));
            }
        }

        let resolved = studies.len();
        let studies = self.filter.filter(scan_location, studies).await;
        tracing::info!(
            resolved,
            pending = studies.len(),
            "Collected studies"
        );
        Ok(studies)
    }
}
