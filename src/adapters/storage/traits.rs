//! Storage abstraction traits
//!
//! This module defines the trait every storage backend implements so that the
//! collector, strategies, extractor and publisher stay backend-neutral.

use crate::domain::{Resource, ResourceKind, Result, Scheme, StagerError};
use async_trait::async_trait;
use std::path::Path;

/// Lists, reads and copies resources on one storage backend
///
/// All backends share the same semantics:
/// - listings are sorted by canonical URL and never partial: any failure
///   fails the whole call with [`StagerError::ResourceCollection`]
/// - copies create missing parent directories and overwrite an existing
///   destination
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Scheme of the resources this provider serves
    fn scheme(&self) -> Scheme;

    /// Resolves a location, filling in kind and last-modified time
    ///
    /// A location that does not exist comes back with
    /// [`ResourceKind::Missing`] rather than as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    async fn resource(&self, location: &Resource) -> Result<Resource>;

    /// Lists a directory
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory to list; must exist and must not be a file
    /// * `recursive` - List the full subtree instead of immediate children
    /// * `exclude_dirs` - Leave out entries that are directories
    ///
    /// # Errors
    ///
    /// Returns a resource collection error if `dir` is missing, is a file,
    /// or any entry cannot be read.
    async fn list_with(
        &self,
        dir: &Resource,
        recursive: bool,
        exclude_dirs: bool,
    ) -> Result<Vec<Resource>>;

    /// Lists the immediate children of a directory
    async fn list(&self, dir: &Resource) -> Result<Vec<Resource>> {
        self.list_with(dir, false, false).await
    }

    /// Lists a directory, optionally descending into subdirectories
    async fn list_recursive(&self, dir: &Resource, recursive: bool) -> Result<Vec<Resource>> {
        self.list_with(dir, recursive, false).await
    }

    /// Reads the full content of a file
    ///
    /// # Errors
    ///
    /// Returns a resource collection error if the file cannot be read.
    async fn read(&self, resource: &Resource) -> Result<Vec<u8>>;

    /// Copies a file from this backend into a local directory
    ///
    /// # Returns
    ///
    /// The local copy, named after the source file.
    async fn copy_from_remote(&self, dest_dir: &Path, resource: &Resource) -> Result<Resource>;

    /// Copies a local file into a directory on this backend
    ///
    /// # Returns
    ///
    /// The remote copy, named after the local file.
    async fn copy_to_remote(&self, dest_dir: &Resource, local_file: &Path) -> Result<Resource>;
}

/// Wraps a backend failure as a resource collection error
pub(crate) fn collection_error(context: impl std::fmt::Display, err: impl std::fmt::Display) -> StagerError {
    StagerError::ResourceCollection(format!("{context}: {err}"))
}

/// Rejects resources of a scheme the provider does not serve
pub(crate) fn ensure_scheme(expected: Scheme, resource: &Resource) -> Result<()> {
    if resource.scheme() != expected {
        return Err(StagerError::ResourceCollection(format!(
            "{expected} provider cannot access {resource}"
        )));
    }
    Ok(())
}

/// Checks that a resolved listing root is an existing directory
pub(crate) fn ensure_listable(dir: &Resource) -> Result<()> {
    match dir.kind() {
        ResourceKind::Directory => Ok(()),
        ResourceKind::File => Err(StagerError::ResourceCollection(format!(
            "Scan location points to a file (should be a directory): {dir}"
        ))),
        _ => Err(StagerError::ResourceCollection(format!(
            "Directory does not exist: {dir}"
        ))),
    }
}

/// Final filename of a local path as UTF-8
pub(crate) fn local_file_name(local_file: &Path) -> Result<String> {
    local_file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            StagerError::ResourceCollection(format!(
                "Not a file path: {}",
                local_file.display()
            ))
        })
}

/// Applies the shared post-processing to a raw listing
pub(crate) fn finish_listing(mut entries: Vec<Resource>, exclude_dirs: bool) -> Vec<Resource> {
    if exclude_dirs {
        entries.retain(|r| !r.is_dir());
    }
    entries.sort_by_key(|r| r.url());
    entries
}
