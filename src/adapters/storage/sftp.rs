//! SFTP provider
//!
//! `ssh2` is a blocking client, so every operation opens its own session
//! inside `spawn_blocking`. Sessions are not pooled; a scan touches the
//! server a handful of times per study.

use super::traits::{
    collection_error, ensure_listable, ensure_scheme, finish_listing, local_file_name,
    ResourceProvider,
};
use crate::config::SftpConfig;
use crate::domain::{Resource, ResourceKind, Result, Scheme, StagerError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use ssh2::{ErrorCode, FileStat, Session, Sftp};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;
use tracing::{debug, info};

/// libssh2 status code for a missing remote path
const SFTP_NO_SUCH_FILE: i32 = 2;

/// Provider for `sftp://` resources
#[derive(Debug, Clone)]
pub struct SftpProvider {
    config: SftpConfig,
}

impl SftpProvider {
    pub fn new(config: SftpConfig) -> Self {
        Self { config }
    }

    /// Runs a blocking SFTP operation against the host of `resource`
    async fn with_sftp<T, F>(&self, resource: &Resource, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Sftp) -> Result<T> + Send + 'static,
    {
        ensure_scheme(Scheme::Sftp, resource)?;
        let config = self.config.clone();
        let host = resource.authority().to_string();

        tokio::task::spawn_blocking(move || {
            let sftp = connect(&config, &host)?;
            op(&sftp)
        })
        .await
        .map_err(|e| StagerError::ResourceCollection(format!("SFTP task panicked: {e}")))?
    }
}

fn connect(config: &SftpConfig, host: &str) -> Result<Sftp> {
    let context = format!("SFTP connection to {}@{}:{}", config.username, host, config.port);

    let tcp = TcpStream::connect((host, config.port)).map_err(|e| collection_error(&context, e))?;
    let mut session = Session::new().map_err(|e| collection_error(&context, e))?;
    session.set_tcp_stream(tcp);
    session.handshake().map_err(|e| collection_error(&context, e))?;

    if let Some(ref key) = config.private_key {
        let passphrase = config
            .private_key_passphrase
            .as_ref()
            .map(|p| p.expose_secret().as_ref().to_string());
        session
            .userauth_pubkey_file(&config.username, None, Path::new(key), passphrase.as_deref())
            .map_err(|e| collection_error(&context, e))?;
    } else if let Some(ref password) = config.password {
        session
            .userauth_password(&config.username, password.expose_secret().as_ref())
            .map_err(|e| collection_error(&context, e))?;
    }

    if !session.authenticated() {
        return Err(StagerError::ResourceCollection(format!(
            "{context}: authentication failed"
        )));
    }

    debug!(host = %host, "SFTP session established");
    session.sftp().map_err(|e| collection_error(&context, e))
}

fn is_missing(err: &ssh2::Error) -> bool {
    err.code() == ErrorCode::SFTP(SFTP_NO_SUCH_FILE)
}

fn to_datetime(stat: &FileStat) -> Option<DateTime<Utc>> {
    stat.mtime
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn from_stat(host: &str, path: &str, stat: &FileStat) -> Resource {
    let kind = if stat.is_dir() {
        ResourceKind::Directory
    } else {
        ResourceKind::File
    };
    Resource::new(Scheme::Sftp, host, path)
        .with_kind(kind)
        .with_last_modified(to_datetime(stat))
}

fn stat_sync(sftp: &Sftp, resource: &Resource) -> Result<Resource> {
    match sftp.stat(Path::new(resource.path())) {
        Ok(stat) => Ok(from_stat(resource.authority(), resource.path(), &stat)),
        Err(e) if is_missing(&e) => Ok(resource.clone().with_kind(ResourceKind::Missing)),
        Err(e) => Err(collection_error(format!("Failed to stat {resource}"), e)),
    }
}

fn read_sync(sftp: &Sftp, resource: &Resource) -> Result<Vec<u8>> {
    let mut file = sftp
        .open(Path::new(resource.path()))
        .map_err(|e| collection_error(format!("Failed to open {resource}"), e))?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(|e| collection_error(format!("Failed to read {resource}"), e))?;
    Ok(data)
}

/// Every ancestor of an absolute remote path, outermost first, including itself
fn remote_ancestors(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    (1..=segments.len())
        .map(|n| format!("/{}", segments[..n].join("/")))
        .collect()
}

fn mkdirs_sync(sftp: &Sftp, dir: &Resource) -> Result<()> {
    for ancestor in remote_ancestors(dir.path()) {
        match sftp.stat(Path::new(&ancestor)) {
            Ok(_) => continue,
            Err(e) if is_missing(&e) => {
                sftp.mkdir(Path::new(&ancestor), 0o755).map_err(|e| {
                    collection_error(format!("Failed to create sftp://{}{}", dir.authority(), ancestor), e)
                })?;
            }
            Err(e) => {
                return Err(collection_error(
                    format!("Failed to stat sftp://{}{}", dir.authority(), ancestor),
                    e,
                ))
            }
        }
    }
    Ok(())
}

#[async_trait]
impl ResourceProvider for SftpProvider {
    fn scheme(&self) -> Scheme {
        Scheme::Sftp
    }

    async fn resource(&self, location: &Resource) -> Result<Resource> {
        let location_owned = location.clone();
        self.with_sftp(location, move |sftp| stat_sync(sftp, &location_owned))
            .await
    }

    async fn list_with(
        &self,
        dir: &Resource,
        recursive: bool,
        exclude_dirs: bool,
    ) -> Result<Vec<Resource>> {
        let dir_owned = dir.clone();
        let entries = self
            .with_sftp(dir, move |sftp| {
                let root = stat_sync(sftp, &dir_owned)?;
                ensure_listable(&root)?;

                let host = root.authority().to_string();
                let mut entries = Vec::new();
                let mut pending = vec![root];

                while let Some(current) = pending.pop() {
                    let children = sftp
                        .readdir(Path::new(current.path()))
                        .map_err(|e| collection_error(format!("Failed to list {current}"), e))?;
                    for (path, stat) in children {
                        let child = from_stat(&host, &path.to_string_lossy(), &stat);
                        if recursive && child.is_dir() {
                            pending.push(child.clone());
                        }
                        entries.push(child);
                    }
                }
                Ok(entries)
            })
            .await?;

        debug!(dir = %dir, count = entries.len(), recursive, "Listed SFTP directory");
        Ok(finish_listing(entries, exclude_dirs))
    }

    async fn read(&self, resource: &Resource) -> Result<Vec<u8>> {
        let resource_owned = resource.clone();
        self.with_sftp(resource, move |sftp| read_sync(sftp, &resource_owned))
            .await
    }

    async fn copy_from_remote(&self, dest_dir: &Path, resource: &Resource) -> Result<Resource> {
        let resource_owned = resource.clone();
        let dest = dest_dir.join(resource.filename());
        let dest_dir = dest_dir.to_path_buf();
        let dest_owned = dest.clone();

        self.with_sftp(resource, move |sftp| {
            let data = read_sync(sftp, &resource_owned)?;
            std::fs::create_dir_all(&dest_dir).map_err(|e| {
                collection_error(format!("Failed to create {}", dest_dir.display()), e)
            })?;
            std::fs::write(&dest_owned, data).map_err(|e| {
                collection_error(format!("Failed to write {}", dest_owned.display()), e)
            })
        })
        .await?;

        debug!(dest = %dest.display(), "Downloaded SFTP file");
        Ok(Resource::from_local_path(&dest).with_kind(ResourceKind::File))
    }

    async fn copy_to_remote(&self, dest_dir: &Resource, local_file: &Path) -> Result<Resource> {
        let target = dest_dir.join(&local_file_name(local_file)?);
        let data = tokio::fs::read(local_file).await.map_err(|e| {
            collection_error(format!("Failed to read {}", local_file.display()), e)
        })?;

        let dir_owned = dest_dir.clone();
        let target_owned = target.clone();
        self.with_sftp(dest_dir, move |sftp| {
            mkdirs_sync(sftp, &dir_owned)?;
            let mut file = sftp
                .create(Path::new(target_owned.path()))
                .map_err(|e| collection_error(format!("Failed to create {target_owned}"), e))?;
            file.write_all(&data)
                .map_err(|e| collection_error(format!("Failed to write {target_owned}"), e))
        })
        .await?;

        info!(target = %target, "Uploaded file over SFTP");
        Ok(target.with_kind(ResourceKind::File))
    }
}
