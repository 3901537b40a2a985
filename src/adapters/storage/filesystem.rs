//! Local filesystem provider

use super::traits::{
    collection_error, ensure_listable, ensure_scheme, finish_listing, local_file_name,
    ResourceProvider,
};
use crate::domain::{Resource, ResourceKind, Result, Scheme, StagerError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Provider for `file://` resources, backed by `tokio::fs`
#[derive(Debug, Clone, Default)]
pub struct FileSystemProvider;

impl FileSystemProvider {
    pub fn new() -> Self {
        Self
    }

    fn local_path(resource: &Resource) -> Result<PathBuf> {
        ensure_scheme(Scheme::File, resource)?;
        resource.local_path().ok_or_else(|| {
            StagerError::ResourceCollection(format!("Not a local resource: {resource}"))
        })
    }

    async fn stat(path: &Path) -> Result<Resource> {
        let resource = Resource::from_local_path(path);
        match tokio::fs::metadata(path).await {
            Ok(metadata) => {
                let kind = if metadata.is_dir() {
                    ResourceKind::Directory
                } else {
                    ResourceKind::File
                };
                let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
                Ok(resource.with_kind(kind).with_last_modified(modified))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(resource.with_kind(ResourceKind::Missing))
            }
            Err(e) => Err(collection_error(
                format!("Failed to stat {}", path.display()),
                e,
            )),
        }
    }
}

#[async_trait]
impl ResourceProvider for FileSystemProvider {
    fn scheme(&self) -> Scheme {
        Scheme::File
    }

    async fn resource(&self, location: &Resource) -> Result<Resource> {
        let path = Self::local_path(location)?;
        Self::stat(&path).await
    }

    async fn list_with(
        &self,
        dir: &Resource,
        recursive: bool,
        exclude_dirs: bool,
    ) -> Result<Vec<Resource>> {
        let root = self.resource(dir).await?;
        ensure_listable(&root)?;

        let mut entries = Vec::new();
        let mut pending = vec![Self::local_path(&root)?];

        while let Some(current) = pending.pop() {
            let mut read_dir = tokio::fs::read_dir(&current).await.map_err(|e| {
                collection_error(format!("Failed to list {}", current.display()), e)
            })?;

            while let Some(entry) = read_dir.next_entry().await.map_err(|e| {
                collection_error(format!("Failed to list {}", current.display()), e)
            })? {
                let child = Self::stat(&entry.path()).await?;
                // Symlinked directories are listed but not descended into
                let is_link = entry
                    .file_type()
                    .await
                    .map(|t| t.is_symlink())
                    .unwrap_or(true);
                if recursive && child.is_dir() && !is_link {
                    pending.push(entry.path());
                }
                entries.push(child);
            }
        }

        tracing::debug!(dir = %dir, count = entries.len(), recursive, "Listed directory");
        Ok(finish_listing(entries, exclude_dirs))
    }

    async fn read(&self, resource: &Resource) -> Result<Vec<u8>> {
        let path = Self::local_path(resource)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| collection_error(format!("Failed to read {}", path.display()), e))
    }

    async fn copy_from_remote(&self, dest_dir: &Path, resource: &Resource) -> Result<Resource> {
        let source = Self::local_path(resource)?;
        let dest = dest_dir.join(resource.filename());
        copy_local(&source, &dest).await?;
        Self::stat(&dest).await
    }

    async fn copy_to_remote(&self, dest_dir: &Resource, local_file: &Path) -> Result<Resource> {
        let dest = Self::local_path(dest_dir)?.join(local_file_name(local_file)?);
        copy_local(local_file, &dest).await?;
        Self::stat(&dest).await
    }
}

async fn copy_local(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            collection_error(format!("Failed to create {}", parent.display()), e)
        })?;
    }
    tokio::fs::copy(source, dest).await.map_err(|e| {
        collection_error(
            format!("Failed to copy {} to {}", source.display(), dest.display()),
            e,
        )
    })?;
    tracing::debug!(source = %source.display(), dest = %dest.display(), "Copied file");
    Ok(())
}
