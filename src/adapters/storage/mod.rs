//! Storage backends for scan locations and the central share
//!
//! Every backend implements [`ResourceProvider`]; [`create_resource_provider`]
//! picks one from `storage.backend`.

pub mod factory;
pub mod filesystem;
pub mod s3;
pub mod sftp;
pub mod traits;

pub use factory::{create_resource_provider, provider_for_scheme};
pub use filesystem::FileSystemProvider;
pub use s3::S3Provider;
pub use sftp::SftpProvider;
pub use traits::ResourceProvider;
