//! Downstream portal command lines
//!
//! The portal tooling runs either directly on this host (`local`) or through
//! docker-compose (`compose`). Builders only assemble [`CommandSpec`]s; the
//! step services run them.

use crate::adapters::process::CommandSpec;
use crate::config::{PortalConfig, PortalMode};
use crate::domain::{Result, StagerError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SCRIPTS_DIR: &str = "core/src/main/scripts";
const IMPORTER_DIR: &str = "core/src/main/scripts/importer";

/// Builds the portal-info, validation, loading and restart commands
pub trait CommandBuilder: Send + Sync {
    /// Dumps portal metadata into `portal_info_dir`
    fn portal_info_command(&self, portal_info_dir: &Path) -> CommandSpec;

    /// Validates a study, writing an HTML report
    fn validator_command(
        &self,
        study_dir: &Path,
        portal_info_dir: &Path,
        report_file: &Path,
    ) -> CommandSpec;

    /// Imports a study into the portal
    fn loader_command(&self, study_dir: &Path) -> CommandSpec;

    /// Commands restarting the portal, run in order
    fn restart_commands(&self) -> Vec<CommandSpec>;

    /// Whether report files must exist before the validator starts
    ///
    /// Bind mounts of a missing file would otherwise create a directory.
    fn precreates_report_files(&self) -> bool;
}

/// Creates the builder for `portal.mode`
///
/// # Errors
///
/// Returns a configuration error if compose mode has no service.
pub fn create_command_builder(portal: &PortalConfig) -> Result<Arc<dyn CommandBuilder>> {
    match portal.mode {
        PortalMode::Local => {
            tracing::info!(source = %portal.source, "Using local portal commands");
            Ok(Arc::new(LocalCommandBuilder::new(&portal.source)))
        }
        PortalMode::Compose => {
            let service = portal
                .compose_service
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    StagerError::Configuration(
                        "portal.compose_service is required when portal.mode = 'compose'"
                            .to_string(),
                    )
                })?;
            tracing::info!(service, "Using docker-compose portal commands");
            Ok(Arc::new(ComposeCommandBuilder::new(
                service,
                &portal.compose_context,
                portal.compose_extensions.clone(),
            )))
        }
    }
}

/// Absolute form of a local path, as handed to external tools
pub(crate) fn absolute(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Portal scripts in a local source checkout, restarted through catalina
#[derive(Debug, Clone)]
pub struct LocalCommandBuilder {
    source: PathBuf,
}

impl LocalCommandBuilder {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl CommandBuilder for LocalCommandBuilder {
    fn portal_info_command(&self, portal_info_dir: &Path) -> CommandSpec {
        CommandSpec::new("./dumpPortalInfo.pl")
            .arg(absolute(portal_info_dir))
            .current_dir(self.source.join(SCRIPTS_DIR))
    }

    fn validator_command(
        &self,
        study_dir: &Path,
        portal_info_dir: &Path,
        report_file: &Path,
    ) -> CommandSpec {
        CommandSpec::new("./validateData.py")
            .args(["-s".to_string(), absolute(study_dir)])
            .args(["-p".to_string(), absolute(portal_info_dir)])
            .args(["-html".to_string(), absolute(report_file)])
            .arg("-v")
            .current_dir(self.source.join(IMPORTER_DIR))
    }

    fn loader_command(&self, study_dir: &Path) -> CommandSpec {
        CommandSpec::new("./cbioportalImporter.py")
            .args(["-s".to_string(), absolute(study_dir)])
            .current_dir(self.source.join(IMPORTER_DIR))
    }

    fn restart_commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("catalina")
                .args(["stop", "-force"])
                .current_dir(&self.source),
            CommandSpec::new("catalina")
                .arg("start")
                .current_dir(&self.source),
        ]
    }

    fn precreates_report_files(&self) -> bool {
        false
    }
}

/// Portal tooling inside a docker-compose service
#[derive(Debug, Clone)]
pub struct ComposeCommandBuilder {
    service: String,
    context: PathBuf,
    extensions: Vec<String>,
}

impl ComposeCommandBuilder {
    pub fn new(service: impl Into<String>, context: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            service: service.into(),
            context: context.into(),
            extensions,
        }
    }

    /// `docker-compose [-f ext]...` in the compose context
    fn compose(&self) -> CommandSpec {
        let mut spec = CommandSpec::new("docker-compose");
        for extension in &self.extensions {
            spec = spec.args(["-f", extension.as_str()]);
        }
        spec.current_dir(&self.context)
    }

    fn run(&self, mounts: &[String]) -> CommandSpec {
        let mut spec = self.compose().args(["run", "--rm"]);
        for mount in mounts {
            spec = spec.args(["-v", mount.as_str()]);
        }
        spec
    }
}

impl CommandBuilder for ComposeCommandBuilder {
    fn portal_info_command(&self, portal_info_dir: &Path) -> CommandSpec {
        self.run(&[format!("{}:/portalinfo", absolute(portal_info_dir))])
            .args(["-w", "/cbioportal/core/src/main/scripts"])
            .arg(&self.service)
            .args(["./dumpPortalInfo.pl", "/portalinfo"])
    }

    fn validator_command(
        &self,
        study_dir: &Path,
        portal_info_dir: &Path,
        report_file: &Path,
    ) -> CommandSpec {
        self.run(&[
            format!("{}:/study:ro", absolute(study_dir)),
            format!("{}:/outreport.html", absolute(report_file)),
            format!("{}:/portalinfo:ro", absolute(portal_info_dir)),
        ])
        .arg(&self.service)
        .args([
            "validateData.py",
            "-p",
            "/portalinfo",
            "-s",
            "/study",
            "--html=/outreport.html",
        ])
    }

    fn loader_command(&self, study_dir: &Path) -> CommandSpec {
        self.run(&[format!("{}:/study:ro", absolute(study_dir))])
            .arg(&self.service)
            .args(["cbioportalImporter.py", "-s", "/study"])
    }

    fn restart_commands(&self) -> Vec<CommandSpec> {
        vec![self.compose().arg("restart").arg(&self.service)]
    }

    fn precreates_report_files(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_commands() {
        let builder = LocalCommandBuilder::new("/opt/portal");

        let load = builder.loader_command(Path::new("/work/s"));
        assert_eq!(load.to_string(), "./cbioportalImporter.py -s /work/s");
        assert_eq!(
            load.working_dir,
            Some(PathBuf::from("/opt/portal/core/src/main/scripts/importer"))
        );

        let validate = builder.validator_command(
            Path::new("/work/s"),
            Path::new("/work/portalInfo"),
            Path::new("/work/s_validation_report.html"),
        );
        assert_eq!(
            validate.to_string(),
            "./validateData.py -s /work/s -p /work/portalInfo -html /work/s_validation_report.html -v"
        );

        let restart = builder.restart_commands();
        assert_eq!(restart.len(), 2);
        assert_eq!(restart[0].to_string(), "catalina stop -force");
        assert_eq!(restart[1].to_string(), "catalina start");
        assert!(!builder.precreates_report_files());
    }

    #[test]
    fn test_compose_commands() {
        let builder = ComposeCommandBuilder::new(
            "cbioportal",
            "/srv/compose",
            vec!["docker-compose.yml".to_string(), "override.yml".to_string()],
        );

        let load = builder.loader_command(Path::new("/work/s"));
        assert_eq!(
            load.to_string(),
            "docker-compose -f docker-compose.yml -f override.yml run --rm -v /work/s:/study:ro cbioportal cbioportalImporter.py -s /study"
        );
        assert_eq!(load.working_dir, Some(PathBuf::from("/srv/compose")));

        let restart = builder.restart_commands();
        assert_eq!(
            restart[0].to_string(),
            "docker-compose -f docker-compose.yml -f override.yml restart cbioportal"
        );
        assert!(builder.precreates_report_files());
    }

    #[test]
    fn test_compose_requires_service() {
        let portal: PortalConfig = toml::from_str("mode = \"compose\"").unwrap();
        assert!(matches!(
            create_command_builder(&portal),
            Err(StagerError::Configuration(_))
        ));
    }
}
