//! Portal restart after loading

use crate::adapters::process::CommandRunner;
use crate::core::etl::commands::CommandBuilder;
use crate::domain::{Result, StagerError};
use std::sync::Arc;

/// Restarts the portal so newly loaded studies become visible
pub struct Restarter {
    runner: Arc<dyn CommandRunner>,
    builder: Arc<dyn CommandBuilder>,
}

impl Restarter {
    pub fn new(runner: Arc<dyn CommandRunner>, builder: Arc<dyn CommandBuilder>) -> Self {
        Self { runner, builder }
    }

    /// Runs the restart commands in order
    ///
    /// Only the last command decides the outcome; a failing stop is logged
    /// and the start is attempted anyway.
    ///
    /// # Errors
    ///
    /// Returns a step error if the final command exits non-zero.
    pub async fn restart(&self) -> Result<()> {
        let commands = self.builder.restart_commands();
        let last = commands.len().saturating_sub(1);

        for (index, spec) in commands.iter().enumerate() {
            tracing::info!(command = %spec, "Restarting portal");
            let code = self.runner.run(spec).await?;
            if code == 0 {
                continue;
            }
            if index == last {
                return Err(StagerError::step(
                    "Restart",
                    format!("'{spec}' exited with code {code}"),
                ));
            }
            tracing::warn!(command = %spec, code, "Restart command failed, continuing");
        }

        tracing::info!("Portal restarted");
        Ok(())
    }
}
