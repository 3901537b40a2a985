//! Post-load authorization hook

use crate::adapters::process::{CommandRunner, CommandSpec};
use crate::config::{AuthorizationConfig, PortalConfig};
use crate::domain::{Result, StagerError, StudyId};
use std::path::PathBuf;
use std::sync::Arc;

/// Grants the configured curators access to newly loaded studies
pub struct Authorizer {
    runner: Arc<dyn CommandRunner>,
    prefix: Vec<String>,
    curator_emails: Vec<String>,
    working_dir: PathBuf,
}

impl Authorizer {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        authorization: &AuthorizationConfig,
        portal: &PortalConfig,
    ) -> Self {
        let prefix = authorization
            .command_prefix
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Self {
            runner,
            prefix,
            curator_emails: authorization.curator_emails.clone(),
            working_dir: PathBuf::from(&portal.compose_context),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.prefix.is_empty() && !self.curator_emails.is_empty()
    }

    /// Command granting one curator access to one study
    pub fn command(&self, study_id: &StudyId, email: &str) -> Option<CommandSpec> {
        CommandSpec::from_argv(
            self.prefix
                .iter()
                .cloned()
                .chain([study_id.to_string(), email.to_string()]),
        )
        .map(|spec| spec.current_dir(&self.working_dir))
    }

    /// Runs the hook for every loaded study and curator
    ///
    /// # Errors
    ///
    /// Returns a configuration error on the first command exiting non-zero.
    pub async fn authorize(&self, study_ids: &[StudyId]) -> Result<()> {
        if !self.is_enabled() {
            tracing::debug!("No authorization command configured");
            return Ok(());
        }

        for study_id in study_ids {
            for email in &self.curator_emails {
                let Some(spec) = self.command(study_id, email) else {
                    continue;
                };
                let code = self.runner.run(&spec).await?;
                if code != 0 {
                    return Err(StagerError::Configuration(format!(
                        "The command {spec} has failed. Please check your configuration."
                    )));
                }
                tracing::info!(study_id = %study_id, email = %email, "Curator authorized");
            }
        }
        Ok(())
    }
}
