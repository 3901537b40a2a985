//! Storage-agnostic resource handles
//!
//! A [`Resource`] names a file or directory on one of the supported backends
//! (local filesystem, S3, SFTP). Its canonical form is `scheme://authority/path`,
//! which is what the ignore-set stores and compares.

use crate::domain::errors::StagerError;
use crate::domain::result::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Storage backend a resource lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    File,
    S3,
    Sftp,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::File => "file",
            Scheme::S3 => "s3",
            Scheme::Sftp => "sftp",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a resource was found to be when it was last resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    File,
    Directory,
    /// Resolved against the backend and not found
    Missing,
    /// Never resolved (parsed from configuration or a manifest)
    Unknown,
}

/// Handle to a file or directory on a storage backend
///
/// Resources are cheap values; they are produced per listing and do not hold
/// connections. Only the canonical [`Resource::url`] outlives a scan, through
/// the ignore-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    scheme: Scheme,
    authority: String,
    path: String,
    kind: ResourceKind,
    last_modified: Option<DateTime<Utc>>,
}

impl Resource {
    /// Creates an unresolved resource from its parts
    ///
    /// The path is normalized: a leading `/` is added, duplicate and trailing
    /// slashes are removed and `.` segments dropped.
    pub fn new(scheme: Scheme, authority: impl Into<String>, path: &str) -> Self {
        Self {
            scheme,
            authority: authority.into(),
            path: normalize_path(path),
            kind: ResourceKind::Unknown,
            last_modified: None,
        }
    }

    /// Parses a location string into a resource
    ///
    /// Accepted forms:
    /// - a plain filesystem path (made absolute against the working directory)
    /// - `file:/abs/path` or `file:///abs/path`
    /// - `s3://bucket/prefix`
    /// - `sftp://[user@]host[:port]/path`
    ///
    /// # Errors
    ///
    /// Returns a configuration error for empty input, unsupported schemes and
    /// remote locations without a host or bucket.
    pub fn parse(location: &str) -> Result<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(StagerError::Configuration(
                "Resource location cannot be empty".to_string(),
            ));
        }

        if let Some(rest) = location.strip_prefix("file:") {
            let path = rest.strip_prefix("//").unwrap_or(rest);
            return Ok(Self::from_local_path(Path::new(path)));
        }

        match location.split_once("://") {
            Some((scheme, rest)) => {
                let scheme = match scheme.to_ascii_lowercase().as_str() {
                    "s3" => Scheme::S3,
                    "sftp" => Scheme::Sftp,
                    other => {
                        return Err(StagerError::Configuration(format!(
                            "Unsupported resource scheme '{other}' in '{location}'. Must be one of: file, s3, sftp"
                        )))
                    }
                };
                let (authority, path) = match rest.split_once('/') {
                    Some((authority, path)) => (authority, path),
                    None => (rest, ""),
                };
                let host = parse_authority(scheme, authority)
                    .map_err(|e| StagerError::Configuration(format!("{e} in '{location}'")))?;
                Ok(Self::new(scheme, host, path))
            }
            None => Ok(Self::from_local_path(Path::new(location))),
        }
    }

    /// Creates a local filesystem resource, resolving relative paths against
    /// the current working directory
    pub fn from_local_path(path: &Path) -> Self {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Self::new(Scheme::File, "", &absolute.to_string_lossy())
    }

    /// Returns a copy carrying the given kind
    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns a copy carrying the given last-modified time
    pub fn with_last_modified(mut self, last_modified: Option<DateTime<Utc>>) -> Self {
        self.last_modified = last_modified;
        self
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Bucket for S3, host for SFTP, empty for local files
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Normalized absolute path within the authority
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    pub fn is_file(&self) -> bool {
        self.kind == ResourceKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == ResourceKind::Directory
    }

    pub fn exists(&self) -> bool {
        matches!(self.kind, ResourceKind::File | ResourceKind::Directory)
    }

    /// Canonical `scheme://authority/path` form, without percent-encoding
    pub fn url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.authority, self.path)
    }

    /// Last path segment, empty for the root
    pub fn filename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    /// Object key for S3 (the path without its leading slash)
    pub fn key(&self) -> &str {
        self.path.trim_start_matches('/')
    }

    /// Parent location, `None` at the root
    pub fn parent(&self) -> Option<Resource> {
        if self.path == "/" {
            return None;
        }
        let parent = match self.path.rfind('/') {
            Some(0) | None => "/",
            Some(idx) => &self.path[..idx],
        };
        Some(Resource::new(self.scheme, self.authority.clone(), parent))
    }

    /// Resolves a relative path beneath this resource
    ///
    /// Leading slashes on `relative` are ignored, so manifest entries written
    /// as `/study/file.txt` still resolve under the scan root.
    pub fn join(&self, relative: &str) -> Resource {
        let relative = relative.trim_start_matches('/');
        Resource::new(
            self.scheme,
            self.authority.clone(),
            &format!("{}/{}", self.path, relative),
        )
    }

    /// Whether this resource is `base` itself or lies beneath it
    pub fn is_under(&self, base: &Resource) -> bool {
        self.relative_to(base).is_some()
    }

    /// Path of this resource relative to `base`, if it lies beneath it
    pub fn relative_to(&self, base: &Resource) -> Option<&str> {
        if self.scheme != base.scheme || self.authority != base.authority {
            return None;
        }
        if self.path == base.path {
            return Some("");
        }
        if base.path == "/" {
            return Some(self.path.trim_start_matches('/'));
        }
        self.path
            .strip_prefix(base.path.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }

    /// Local filesystem path, `None` for remote resources
    pub fn local_path(&self) -> Option<PathBuf> {
        match self.scheme {
            Scheme::File => Some(PathBuf::from(&self.path)),
            _ => None,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    format!("/{}", segments.join("/"))
}

/// Extracts the host (or bucket) from an authority, ignoring user and port
fn parse_authority(scheme: Scheme, authority: &str) -> std::result::Result<String, String> {
    if authority.is_empty() {
        return Err(format!("Missing host or bucket for {scheme} location"));
    }
    let url = url::Url::parse(&format!("{scheme}://{authority}/"))
        .map_err(|e| format!("Invalid {scheme} authority '{authority}': {e}"))?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(host.to_string()),
        _ => Err(format!("Missing host or bucket for {scheme} location")),
    }
}
