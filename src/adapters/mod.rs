//! External integrations
//!
//! - [`storage`] - filesystem, S3 and SFTP resource providers
//! - [`process`] - external command execution and the advisory lock

pub mod process;
pub mod storage;
