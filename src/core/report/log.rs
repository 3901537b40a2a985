//! Log-file reporting backend

use crate::config::ReportingConfig;
use crate::core::etl::StudyOutcome;
use crate::core::report::ReportingService;
use crate::domain::{ExitStatus, Result, StagerError, StudyId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::AsyncWriteExt;

/// Entry format of the report log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Html,
}

impl FromStr for LogFormat {
    type Err = StagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(LogFormat::Text),
            "html" => Ok(LogFormat::Html),
            _ => Err(StagerError::Configuration(format!(
                "Invalid reporting.log_format '{s}'. Must be one of: text, html"
            ))),
        }
    }
}

/// Appends report entries to a local file
pub struct LogReportingService {
    file: PathBuf,
    format: LogFormat,
    server_alias: String,
}

impl LogReportingService {
    /// Creates the service, creating the file first when asked to
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a missing file setting or unknown
    /// format, and a report error if the file cannot be created.
    pub async fn new(
        file: impl Into<PathBuf>,
        format: LogFormat,
        server_alias: impl Into<String>,
        create_if_missing: bool,
    ) -> Result<Self> {
        let file = file.into();
        if create_if_missing && !tokio::fs::try_exists(&file).await.unwrap_or(false) {
            if let Some(parent) = file.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StagerError::Report(format!("Cannot create {}: {}", parent.display(), e))
                })?;
            }
            tokio::fs::write(&file, "").await.map_err(|e| {
                StagerError::Report(format!("Cannot create {}: {}", file.display(), e))
            })?;
        }
        Ok(Self {
            file,
            format,
            server_alias: server_alias.into(),
        })
    }

    pub async fn from_config(reporting: &ReportingConfig, server_alias: &str) -> Result<Self> {
        let file = reporting
            .log_file
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| {
                StagerError::Configuration("No valid reporting.log_file set.".to_string())
            })?;
        let format = reporting.log_format.parse()?;
        Self::new(file, format, server_alias, reporting.create_if_missing).await
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    async fn append(&self, entry: &str) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .await
            .map_err(|e| self.write_error(e))?;
        file.write_all(entry.as_bytes())
            .await
            .map_err(|e| self.write_error(e))?;
        file.flush().await.map_err(|e| self.write_error(e))?;
        Ok(())
    }

    fn write_error(&self, e: std::io::Error) -> StagerError {
        StagerError::Report(format!("Cannot write to log file {}: {}", self.file.display(), e))
    }

    fn header(&self, title: &str) -> String {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let alias = if self.server_alias.is_empty() {
            String::new()
        } else {
            format!(" [{}]", self.server_alias)
        };
        format!("{now}{alias} {title}")
    }

    /// Renders a titled entry with one line per item
    fn render(&self, title: &str, lines: &[String]) -> String {
        let header = self.header(title);
        match self.format {
            LogFormat::Text => {
                let mut entry = format!("{header}\n");
                for line in lines {
                    let _ = writeln!(entry, "  {line}");
                }
                entry.push('\n');
                entry
            }
            LogFormat::Html => {
                let mut entry = format!("<div class=\"entry\">\n<h3>{}</h3>\n<ul>\n", escape_html(&header));
                for line in lines {
                    let _ = writeln!(entry, "<li>{}</li>", escape_html(line));
                }
                entry.push_str("</ul>\n</div>\n");
                entry
            }
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn status_line(step: &str, status: Option<ExitStatus>, artifact: &Path) -> String {
    match status {
        Some(status) => format!("{step}: {status} (log: {})", artifact.display()),
        None => format!("{step}: NOT RUN"),
    }
}

#[async_trait]
impl ReportingService for LogReportingService {
    async fn report_study_file_not_found(
        &self,
        failed_studies: &BTreeMap<StudyId, Vec<String>>,
        retry_attempts: u32,
    ) -> Result<()> {
        let mut lines = vec![format!(
            "The following files could not be copied after {retry_attempts} attempt(s):"
        )];
        for (study_id, files) in failed_studies {
            for file in files {
                lines.push(format!("{study_id}: {file}"));
            }
        }
        self.append(&self.render("Study files not found", &lines)).await
    }

    async fn report_summary(&self, outcome: &StudyOutcome) -> Result<()> {
        let artifacts = &outcome.artifacts;
        let mut lines = vec![
            format!("Version: {}", if outcome.version.is_empty() { "-" } else { &outcome.version }),
            format!("Timestamp: {}", outcome.timestamp),
            status_line("Transformation", outcome.transformation, &artifacts.transformation_log),
            status_line("Validation", outcome.validation, &artifacts.validation_log),
        ];
        if outcome.validation.is_some() {
            lines.push(format!("Validation report: {}", artifacts.validation_report.display()));
        }
        lines.push(status_line("Loading", outcome.loading, &artifacts.loading_log));
        for copy in &outcome.published {
            lines.push(format!("Published: {copy}"));
        }
        if let Some(ref error) = outcome.error {
            lines.push(format!("Error: {error}"));
        }

        let title = format!("Summary for study {}", outcome.study_id);
        self.append(&self.render(&title, &lines)).await
    }

    async fn report_generic_error(&self, message: &str, error: Option<&StagerError>) -> Result<()> {
        let mut lines = vec![message.to_string()];
        if let Some(error) = error {
            lines.push(format!("Cause: {error}"));
        }
        self.append(&self.render("Error", &lines)).await
    }
}
