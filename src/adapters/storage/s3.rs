//! S3 provider
//!
//! Objects are addressed as `s3://bucket/key`. S3 has no directories, so a
//! directory is any key prefix that has objects beneath it.

use super::traits::{
    collection_error, ensure_listable, ensure_scheme, finish_listing, local_file_name,
    ResourceProvider,
};
use crate::config::S3Config;
use crate::domain::{Resource, ResourceKind, Result, Scheme, StagerError};
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Provider for `s3://` resources
#[derive(Clone)]
pub struct S3Provider {
    client: Client,
}

impl S3Provider {
    /// Builds a client from configuration
    ///
    /// Static keys are used when configured, otherwise the default AWS
    /// credential chain (environment, profile, instance metadata).
    pub async fn new(config: &S3Config) -> Result<Self> {
        let client = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials = Credentials::new(
                    access_key,
                    secret_key.expose_secret().as_ref(),
                    None,
                    None,
                    "stager-static",
                );

                let mut builder = aws_sdk_s3::Config::builder()
                    .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
                    .credentials_provider(credentials)
                    .region(Region::new(config.region.clone()))
                    .force_path_style(config.path_style);

                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint_url(endpoint);
                }

                Client::from_conf(builder.build())
            }
            _ => {
                let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;

                let mut builder =
                    aws_sdk_s3::config::Builder::from(&shared).force_path_style(config.path_style);

                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint_url(endpoint);
                }

                Client::from_conf(builder.build())
            }
        };

        info!(
            region = %config.region,
            endpoint = config.endpoint.as_deref().unwrap_or("default"),
            "S3 client initialized"
        );

        Ok(Self { client })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn has_children(&self, bucket: &str, prefix: &str) -> Result<bool> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(1)
            .send()
            .await
            .map_err(|e| {
                collection_error(format!("Failed to list s3://{bucket}/{prefix}"), DisplayErrorContext(&e))
            })?;
        Ok(output.key_count().unwrap_or(0) > 0 || !output.contents().is_empty())
    }

    async fn get_bytes(&self, resource: &Resource) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(resource.authority())
            .key(resource.key())
            .send()
            .await
            .map_err(|e| collection_error(format!("Failed to download {resource}"), DisplayErrorContext(&e)))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| collection_error(format!("Failed to read body of {resource}"), e))?;

        Ok(data.into_bytes().to_vec())
    }
}

#[async_trait]
impl ResourceProvider for S3Provider {
    fn scheme(&self) -> Scheme {
        Scheme::S3
    }

    #[instrument(skip(self), fields(location = %location))]
    async fn resource(&self, location: &Resource) -> Result<Resource> {
        ensure_scheme(Scheme::S3, location)?;
        let bucket = location.authority();
        let key = location.key();

        if key.is_empty() {
            return Ok(location.clone().with_kind(ResourceKind::Directory));
        }

        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(head) => {
                let modified = head.last_modified().and_then(to_datetime);
                return Ok(location
                    .clone()
                    .with_kind(ResourceKind::File)
                    .with_last_modified(modified));
            }
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|service| service.is_not_found())
                    .unwrap_or(false);
                if !not_found {
                    return Err(collection_error(
                        format!("Failed to stat {location}"),
                        DisplayErrorContext(&e),
                    ));
                }
            }
        }

        let kind = if self.has_children(bucket, &format!("{key}/")).await? {
            ResourceKind::Directory
        } else {
            ResourceKind::Missing
        };
        Ok(location.clone().with_kind(kind))
    }

    #[instrument(skip(self), fields(dir = %dir))]
    async fn list_with(
        &self,
        dir: &Resource,
        recursive: bool,
        exclude_dirs: bool,
    ) -> Result<Vec<Resource>> {
        let root = self.resource(dir).await?;
        ensure_listable(&root)?;

        let bucket = root.authority().to_string();
        let prefix = match root.key() {
            "" => String::new(),
            key => format!("{key}/"),
        };

        let mut request = self
            .client
            .list_objects_v2()
            .bucket(&bucket)
            .prefix(&prefix);
        if !recursive {
            request = request.delimiter("/");
        }

        let mut files = Vec::new();
        let mut dirs = BTreeSet::new();
        let mut pages = request.into_paginator().send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                collection_error(format!("Failed to list {root}"), DisplayErrorContext(&e))
            })?;

            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                if key == prefix {
                    continue;
                }
                if recursive {
                    dirs.extend(implied_directories(&prefix, key));
                }
                if let Some(marker) = key.strip_suffix('/') {
                    dirs.insert(marker.to_string());
                    continue;
                }
                let modified = object.last_modified().and_then(to_datetime);
                files.push(
                    Resource::new(Scheme::S3, bucket.clone(), key)
                        .with_kind(ResourceKind::File)
                        .with_last_modified(modified),
                );
            }

            for common in page.common_prefixes() {
                if let Some(p) = common.prefix() {
                    dirs.insert(p.trim_end_matches('/').to_string());
                }
            }
        }

        let mut entries = files;
        entries.extend(dirs.into_iter().map(|d| {
            Resource::new(Scheme::S3, bucket.clone(), &d).with_kind(ResourceKind::Directory)
        }));

        debug!(count = entries.len(), recursive, "Listed S3 prefix");
        Ok(finish_listing(entries, exclude_dirs))
    }

    #[instrument(skip(self), fields(resource = %resource))]
    async fn read(&self, resource: &Resource) -> Result<Vec<u8>> {
        ensure_scheme(Scheme::S3, resource)?;
        self.get_bytes(resource).await
    }

    #[instrument(skip(self), fields(resource = %resource))]
    async fn copy_from_remote(&self, dest_dir: &Path, resource: &Resource) -> Result<Resource> {
        ensure_scheme(Scheme::S3, resource)?;
        let data = self.get_bytes(resource).await?;

        tokio::fs::create_dir_all(dest_dir).await.map_err(|e| {
            collection_error(format!("Failed to create {}", dest_dir.display()), e)
        })?;
        let dest = dest_dir.join(resource.filename());
        tokio::fs::write(&dest, &data)
            .await
            .map_err(|e| collection_error(format!("Failed to write {}", dest.display()), e))?;

        debug!(dest = %dest.display(), bytes = data.len(), "Downloaded object");
        Ok(Resource::from_local_path(&dest).with_kind(ResourceKind::File))
    }

    #[instrument(skip(self), fields(dest_dir = %dest_dir))]
    async fn copy_to_remote(&self, dest_dir: &Resource, local_file: &Path) -> Result<Resource> {
        ensure_scheme(Scheme::S3, dest_dir)?;
        let target = dest_dir.join(&local_file_name(local_file)?);

        let data = tokio::fs::read(local_file).await.map_err(|e| {
            StagerError::ResourceCollection(format!(
                "Failed to read {}: {}",
                local_file.display(),
                e
            ))
        })?;
        let size = data.len();

        self.client
            .put_object()
            .bucket(target.authority())
            .key(target.key())
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| collection_error(format!("Failed to upload to {target}"), DisplayErrorContext(&e)))?;

        info!(target = %target, bytes = size, "Uploaded object");
        Ok(target.with_kind(ResourceKind::File))
    }
}

fn to_datetime(time: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

/// Directory prefixes between the listing prefix and an object key
///
/// `implied_directories("scan/", "scan/a/b/file.txt")` yields `scan/a` and
/// `scan/a/b`.
fn implied_directories(prefix: &str, key: &str) -> Vec<String> {
    let Some(relative) = key.strip_prefix(prefix) else {
        return Vec::new();
    };
    let segments: Vec<&str> = relative.split('/').collect();
    (1..segments.len())
        .map(|n| format!("{prefix}{}", segments[..n].join("/")))
        .filter(|d| !d.ends_with('/') && d.len() > prefix.len())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implied_directories() {
        assert_eq!(
            implied_directories("scan/", "scan/a/b/file.txt"),
            vec!["scan/a".to_string(), "scan/a/b".to_string()]
        );
        assert!(implied_directories("scan/", "scan/file.txt").is_empty());
        assert!(implied_directories("other/", "scan/a/file.txt").is_empty());
    }

    #[test]
    fn test_implied_directories_from_bucket_root() {
        assert_eq!(
            implied_directories("", "study/meta_study.txt"),
            vec!["study".to_string()]
        );
    }

    #[test]
    fn test_directory_marker_key_yields_parent_only() {
        assert_eq!(
            implied_directories("scan/", "scan/a/"),
            vec!["scan/a".to_string()]
        );
    }

    #[test]
    fn test_to_datetime() {
        let time = aws_sdk_s3::primitives::DateTime::from_secs(1_700_000_000);
        let converted = to_datetime(&time).unwrap();
        assert_eq!(converted.timestamp(), 1_700_000_000);
    }
}
