//! Load step

use crate::adapters::process::CommandRunner;
use crate::core::etl::commands::CommandBuilder;
use crate::domain::{ExitStatus, Result};
use std::path::Path;
use std::sync::Arc;

/// Imports validated studies into the portal
pub struct Loader {
    runner: Arc<dyn CommandRunner>,
    builder: Arc<dyn CommandBuilder>,
}

impl Loader {
    pub fn new(runner: Arc<dyn CommandRunner>, builder: Arc<dyn CommandBuilder>) -> Self {
        Self { runner, builder }
    }

    /// Loads one study; the importer has no warning state
    ///
    /// # Errors
    ///
    /// Returns a command error if the importer cannot be run to completion.
    pub async fn load(&self, study_dir: &Path, log_file: &Path) -> Result<ExitStatus> {
        let spec = self.builder.loader_command(study_dir).log_to(log_file);
        tracing::info!(command = %spec, "Starting loading");
        let code = self.runner.run(&spec).await?;
        Ok(ExitStatus::from_binary_exit_code(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::process::CommandSpec;
    use crate::core::etl::commands::LocalCommandBuilder;
    use async_trait::async_trait;

    struct FixedRunner(i32);

    #[async_trait]
    impl CommandRunner for FixedRunner {
        async fn run(&self, _spec: &CommandSpec) -> Result<i32> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_warning_code_is_error_for_loading() {
        let builder = Arc::new(LocalCommandBuilder::new("/opt/portal"));
        let loader = Loader::new(Arc::new(FixedRunner(3)), builder.clone());
        assert_eq!(
            loader.load(Path::new("/s"), Path::new("/l.txt")).await.unwrap(),
            ExitStatus::Error
        );

        let loader = Loader::new(Arc::new(FixedRunner(0)), builder);
        assert_eq!(
            loader.load(Path::new("/s"), Path::new("/l.txt")).await.unwrap(),
            ExitStatus::Success
        );
    }
}
