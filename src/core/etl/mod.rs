//! ETL pipeline
//!
//! Step services each wrap one external command and map its exit code to an
//! [`ExitStatus`](crate::domain::ExitStatus). The [`EtlProcessRunner`] chains
//! them per study.

pub mod authorizer;
pub mod commands;
pub mod loader;
pub mod restarter;
pub mod runner;
pub mod summary;
pub mod transformer;
pub mod validator;

pub use authorizer::Authorizer;
pub use commands::{create_command_builder, CommandBuilder, ComposeCommandBuilder, LocalCommandBuilder};
pub use loader::Loader;
pub use restarter::Restarter;
pub use runner::EtlProcessRunner;
pub use summary::{EtlSummary, StudyOutcome};
pub use transformer::Transformer;
pub use validator::Validator;
