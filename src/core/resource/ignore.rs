//! Ignore-set of already processed resources
//!
//! The set holds canonical resource URLs. It is loaded once at startup from a
//! newline-delimited file and appended to after every processed scan, so
//! studies are not picked up twice.

use crate::config::ScanConfig;
use crate::domain::{Resource, Result, StagerError};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Persistence port behind the ignore-set
pub trait IgnoreStore: Send + Sync {
    /// Reads every stored line
    fn read_all(&self) -> Result<Vec<String>>;

    /// Appends entries, one per line
    fn append(&self, entries: &[String]) -> Result<()>;

    /// Removes the backing storage
    fn clear(&self) -> Result<()>;
}

/// [`IgnoreStore`] backed by a UTF-8 text file
#[derive(Debug, Clone)]
pub struct FileIgnoreStore {
    path: PathBuf,
}

impl FileIgnoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, action: &str, err: std::io::Error) -> StagerError {
        StagerError::Io(format!(
            "Failed to {} ignore file {}: {}",
            action,
            self.path.display(),
            err
        ))
    }
}

impl IgnoreStore for FileIgnoreStore {
    fn read_all(&self) -> Result<Vec<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.io_error("read", e)),
        }
    }

    fn append(&self, entries: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error("create directory for", e))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error("open", e))?;

        let mut buffer = String::new();
        for entry in entries {
            buffer.push_str(entry);
            buffer.push('\n');
        }
        file.write_all(buffer.as_bytes())
            .and_then(|_| file.sync_data())
            .map_err(|e| self.io_error("append to", e))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error("delete", e)),
        }
    }
}

/// In-memory set of processed resource URLs with optional persistence
pub struct IgnoreSet {
    entries: HashSet<String>,
    store: Option<Box<dyn IgnoreStore>>,
    persist: bool,
}

impl IgnoreSet {
    /// Creates an empty set that is never persisted
    pub fn in_memory() -> Self {
        Self {
            entries: HashSet::new(),
            store: None,
            persist: false,
        }
    }

    /// Loads the set from a store
    ///
    /// Each non-blank line is canonicalized through [`Resource::parse`];
    /// lines that do not parse are kept verbatim.
    ///
    /// # Arguments
    ///
    /// * `store` - Backing storage
    /// * `persist` - Write appended entries back to the store
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(store: Box<dyn IgnoreStore>, persist: bool) -> Result<Self> {
        let mut entries = HashSet::new();
        for line in store.read_all()? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let canonical = match Resource::parse(line) {
                Ok(resource) => resource.url(),
                Err(e) => {
                    tracing::warn!(entry = line, error = %e, "Keeping unparsable ignore entry verbatim");
                    line.to_string()
                }
            };
            entries.insert(canonical);
        }

        tracing::info!(entries = entries.len(), persist, "Loaded ignore set");
        Ok(Self {
            entries,
            store: Some(store),
            persist,
        })
    }

    /// Builds the set described by the scan configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configured ignore file cannot be read.
    pub fn from_config(scan: &ScanConfig) -> Result<Self> {
        match scan.ignore_file.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => {
                Self::load(Box::new(FileIgnoreStore::new(path)), scan.ignore_append)
            }
            _ => {
                tracing::info!("No ignore file configured, processed resources are kept in memory only");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn contains(&self, resource: &Resource) -> bool {
        self.entries.contains(&resource.url())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds resources to the set
    ///
    /// Only URLs not already present are written to the store, and the store
    /// is written before memory is updated, so a failed write leaves both
    /// unchanged.
    ///
    /// # Returns
    ///
    /// The number of newly added entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be appended to.
    pub fn append_resources(&mut self, resources: &[Resource]) -> Result<usize> {
        let mut added = Vec::new();
        let mut seen = HashSet::new();
        for resource in resources {
            let url = resource.url();
            if !self.entries.contains(&url) && seen.insert(url.clone()) {
                added.push(url);
            }
        }

        if added.is_empty() {
            return Ok(0);
        }

        if self.persist {
            if let Some(ref store) = self.store {
                store.append(&added)?;
            }
        }

        let count = added.len();
        self.entries.extend(added);
        tracing::debug!(added = count, total = self.entries.len(), "Updated ignore set");
        Ok(count)
    }

    /// Clears the set and deletes its backing file
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file exists but cannot be deleted.
    pub fn reset_and_delete_file(&mut self) -> Result<()> {
        self.entries.clear();
        if let Some(ref store) = self.store {
            store.clear()?;
        }
        tracing::info!("Ignore set reset");
        Ok(())
    }
}

impl std::fmt::Debug for IgnoreSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IgnoreSet")
            .field("entries", &self.entries.len())
            .field("persist", &self.persist)
            .finish()
    }
}
