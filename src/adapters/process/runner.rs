//! External command execution
//!
//! Every transform, validation, load, restart and authorization step goes
//! through [`CommandRunner`]: argv plus working directory in, exit code out,
//! with stdout and stderr appended to a log file.

use crate::domain::{CommandError, Result};
use async_trait::async_trait;
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

/// One external command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Receives stdout and stderr, appended
    pub log_file: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            log_file: None,
        }
    }

    /// Builds a spec from a full argv, the first element being the program
    pub fn from_argv<I, S>(argv: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next()?;
        Some(Self::new(program).args(argv))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn log_to(mut self, log_file: impl Into<PathBuf>) -> Self {
        self.log_file = Some(log_file.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs external commands to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command and waits for it to exit
    ///
    /// # Returns
    ///
    /// The process exit code. A non-zero code is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the process cannot be started, is killed
    /// before reporting an exit code, or exceeds the timeout.
    async fn run(&self, spec: &CommandSpec) -> Result<i32>;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

fn open_log(program: &str, log_file: &Path) -> std::result::Result<std::fs::File, CommandError> {
    let io_error = |e: std::io::Error| CommandError::Io {
        program: program.to_string(),
        message: format!("cannot open log {}: {}", log_file.display(), e),
    };
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(io_error)
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<i32> {
        let program = spec.program.clone();
        let mut command = tokio::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if let Some(ref dir) = spec.working_dir {
            command.current_dir(dir);
        }

        if let Some(ref log_file) = spec.log_file {
            let stdout = open_log(&program, log_file)?;
            let stderr = stdout.try_clone().map_err(|e| CommandError::Io {
                program: program.clone(),
                message: e.to_string(),
            })?;
            command.stdout(Stdio::from(stdout)).stderr(Stdio::from(stderr));
        }

        tracing::debug!(command = %spec, working_dir = ?spec.working_dir, "Running command");

        let mut child = command.spawn().map_err(|e| CommandError::Spawn {
            program: program.clone(),
            message: e.to_string(),
        })?;

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(waited) => waited,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(command = %spec, error = %e, "Failed to kill timed out command");
                    }
                    return Err(CommandError::TimedOut {
                        program,
                        seconds: limit.as_secs(),
                    }
                    .into());
                }
            },
            None => child.wait().await,
        };

        let status = waited.map_err(|e| CommandError::Io {
            program: program.clone(),
            message: e.to_string(),
        })?;

        match status.code() {
            Some(code) => {
                tracing::debug!(command = %spec, exit_code = code, "Command finished");
                Ok(code)
            }
            None => Err(CommandError::Interrupted { program }.into()),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::StagerError;
    use tempfile::TempDir;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_exit_code_is_returned() {
        let runner = ProcessRunner::default();
        assert_eq!(runner.run(&sh("exit 0")).await.unwrap(), 0);
        assert_eq!(runner.run(&sh("exit 3")).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_output_is_appended_to_log() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("logs/study_loading_log.txt");
        let runner = ProcessRunner::default();

        runner
            .run(&sh("echo first; echo oops >&2").log_to(&log))
            .await
            .unwrap();
        runner.run(&sh("echo second").log_to(&log)).await.unwrap();

        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.contains("first"));
        assert!(content.contains("oops"));
        assert!(content.contains("second"));
    }

    #[tokio::test]
    async fn test_working_dir_is_used() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("pwd.txt");
        let runner = ProcessRunner::default();

        runner
            .run(&sh("pwd").current_dir(dir.path()).log_to(&log))
            .await
            .unwrap();
        let content = std::fs::read_to_string(&log).unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(content.trim(), expected.to_string_lossy());
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let runner = ProcessRunner::default();
        let err = runner
            .run(&CommandSpec::new("/definitely/not/a/program"))
            .await
            .unwrap_err();
        assert!(matches!(err, StagerError::Command(CommandError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_signal_is_interrupted() {
        let runner = ProcessRunner::default();
        let err = runner.run(&sh("kill -9 $$")).await.unwrap_err();
        assert!(err.is_indeterminate());
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let runner = ProcessRunner::new(Some(Duration::from_millis(200)));
        let err = runner.run(&sh("sleep 5")).await.unwrap_err();
        assert!(matches!(
            err,
            StagerError::Command(CommandError::TimedOut { .. })
        ));
    }

    #[test]
    fn test_spec_display_and_argv() {
        let spec = CommandSpec::from_argv(["docker", "run", "--rm"]).unwrap();
        assert_eq!(spec.program, "docker");
        assert_eq!(spec.to_string(), "docker run --rm");
        assert!(CommandSpec::from_argv(Vec::<String>::new()).is_none());
    }
}
