//! Transform step

use crate::adapters::process::{CommandRunner, CommandSpec};
use crate::config::TransformationConfig;
use crate::core::etl::commands::absolute;
use crate::core::resource::meta::META_STUDY_FILE;
use crate::domain::{ExitStatus, Result, StagerError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const STEP: &str = "Transformation";

/// Runs the configured transformation command on an extracted study
pub struct Transformer {
    runner: Arc<dyn CommandRunner>,
    config: TransformationConfig,
}

impl Transformer {
    pub fn new(runner: Arc<dyn CommandRunner>, config: TransformationConfig) -> Self {
        Self { runner, config }
    }

    /// Whether studies bypass transformation
    pub fn skips(&self) -> bool {
        self.config.skip
    }

    /// Script tokens with the script path made absolute
    fn script_tokens(&self) -> Result<Vec<String>> {
        let Some(script) = self.config.script() else {
            return Ok(Vec::new());
        };
        let mut tokens: Vec<String> = script.split_whitespace().map(str::to_string).collect();
        let path = PathBuf::from(&tokens[0]);
        match std::fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => {
                return Err(StagerError::step(
                    STEP,
                    format!(
                        "transformation.command_script points to a directory: {}",
                        path.display()
                    ),
                ))
            }
            Err(_) => {
                return Err(StagerError::step(
                    STEP,
                    format!(
                        "transformation.command_script does not exist: {}",
                        path.display()
                    ),
                ))
            }
        }
        tokens[0] = absolute(&path);
        Ok(tokens)
    }

    /// Full command line for one study
    ///
    /// # Errors
    ///
    /// Returns a step error if the script does not point to a file.
    pub fn build_command(&self, untransformed_dir: &Path, transformed_dir: &Path) -> Result<CommandSpec> {
        let input = absolute(untransformed_dir);
        let output = absolute(transformed_dir);

        let mut argv = Vec::new();
        if let Some(image) = self.config.image() {
            argv.extend([
                "docker".to_string(),
                "run".to_string(),
                "--rm".to_string(),
                "-v".to_string(),
                format!("{input}:{input}"),
                "-v".to_string(),
                format!("{output}:{output}"),
                image.to_string(),
            ]);
        }
        argv.extend(self.script_tokens()?);
        argv.extend(["-i".to_string(), input, "-o".to_string(), output]);

        CommandSpec::from_argv(argv)
            .ok_or_else(|| StagerError::step(STEP, "No transformation command configured"))
    }

    /// Transforms one study
    ///
    /// With `transformation.skip`, a study is SKIPPED when it already holds
    /// a study marker file and ERROR otherwise; nothing is run.
    ///
    /// # Errors
    ///
    /// Returns a step error for a bad script path and a command error when
    /// the process cannot be run to completion.
    pub async fn transform(
        &self,
        untransformed_dir: &Path,
        transformed_dir: &Path,
        log_file: &Path,
    ) -> Result<ExitStatus> {
        if self.config.skip {
            return self.check_ready(untransformed_dir, log_file).await;
        }

        let spec = self
            .build_command(untransformed_dir, transformed_dir)?
            .log_to(log_file);
        tracing::info!(command = %spec, "Starting transformation");
        let code = self.runner.run(&spec).await?;
        Ok(ExitStatus::from_exit_code(code))
    }

    async fn check_ready(&self, study_dir: &Path, log_file: &Path) -> Result<ExitStatus> {
        if has_study_marker(study_dir).await? {
            tracing::info!(dir = %study_dir.display(), "Transformation skipped, study is ready for validation");
            return Ok(ExitStatus::Skipped);
        }

        let note = format!(
            "Transformation is skipped but {} contains no {}. The study cannot be validated as is.\n",
            study_dir.display(),
            META_STUDY_FILE
        );
        append_note(log_file, &note).await?;
        tracing::warn!(dir = %study_dir.display(), "Study is not ready and transformation is skipped");
        Ok(ExitStatus::Error)
    }
}

async fn has_study_marker(dir: &Path) -> Result<bool> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_string_lossy().ends_with(META_STUDY_FILE) {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn append_note(log_file: &Path, note: &str) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    if let Some(parent) = log_file.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .await?;
    file.write_all(note.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
