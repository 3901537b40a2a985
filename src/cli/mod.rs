//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Stager using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Stager - scheduled study staging and loading
#[derive(Parser, Debug)]
#[command(name = "stager")]
#[command(version, about, long_about = None)]
#[command(author = "Stager Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "stager.toml", env = "STAGER_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "STAGER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan for new studies and run them through the ETL pipeline
    Scan(commands::scan::ScanArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_scan() {
        let cli = Cli::parse_from(["stager", "scan"]);
        assert_eq!(cli.config, "stager.toml");
        assert!(matches!(cli.command, Commands::Scan(ref args) if !args.once));
    }

    #[test]
    fn test_cli_parse_scan_once_with_overrides() {
        let cli = Cli::parse_from([
            "stager",
            "--config",
            "custom.toml",
            "scan",
            "--once",
            "--location",
            "s3://bucket/incoming",
        ]);
        assert_eq!(cli.config, "custom.toml");
        match cli.command {
            Commands::Scan(args) => {
                assert!(args.once);
                assert_eq!(args.location.as_deref(), Some("s3://bucket/incoming"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["stager", "--log-level", "debug", "scan"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["stager", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["stager", "init", "--output", "x.toml", "--force"]);
        assert!(matches!(cli.command, Commands::Init(ref args) if args.force && args.output == "x.toml"));
    }
}
