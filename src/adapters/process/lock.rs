//! Cross-process advisory locking
//!
//! Only one instance may process a scan at a time. The default mechanism
//! binds a well-known port on the loopback interface: the bind fails while
//! another instance holds it, and the OS releases it when the holder exits.

use crate::domain::{Result, StagerError};
use std::any::Any;
use std::net::{Ipv4Addr, TcpListener};

/// Acquire-or-fail lock held for the duration of one scan
pub trait AdvisoryLock: Send + Sync {
    /// Takes the lock
    ///
    /// # Errors
    ///
    /// Returns [`StagerError::Lock`] immediately if another holder exists;
    /// it never waits.
    fn acquire(&self) -> Result<LockGuard>;
}

/// Releases the lock when dropped
pub struct LockGuard {
    name: String,
    _held: Box<dyn Any + Send + Sync>,
}

impl LockGuard {
    pub fn new(name: impl Into<String>, held: impl Any + Send + Sync) -> Self {
        Self {
            name: name.into(),
            _held: Box::new(held),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        tracing::debug!(lock = %self.name, "Released lock");
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("name", &self.name).finish()
    }
}

/// Lock on a TCP port of 127.0.0.1
#[derive(Debug, Clone)]
pub struct PortLock {
    port: u16,
}

impl PortLock {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl AdvisoryLock for PortLock {
    fn acquire(&self) -> Result<LockGuard> {
        match TcpListener::bind((Ipv4Addr::LOCALHOST, self.port)) {
            Ok(listener) => {
                tracing::debug!(port = self.port, "Acquired lock port");
                Ok(LockGuard::new(format!("port {}", self.port), listener))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => Err(StagerError::Lock(format!(
                "Another ETL process is already running (port {} is in use)",
                self.port
            ))),
            Err(e) => Err(StagerError::Lock(format!(
                "Failed to bind lock port {}: {}",
                self.port, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let holder = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = holder.local_addr().unwrap().port();

        let err = PortLock::new(port).acquire().unwrap_err();
        assert!(matches!(err, StagerError::Lock(_)));
        assert!(err.to_string().contains("already running"));
    }

    #[test]
    fn test_release_on_drop() {
        let probe = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let lock = PortLock::new(port);
        let guard = lock.acquire().unwrap();
        assert!(lock.acquire().is_err());
        drop(guard);
        assert!(lock.acquire().is_ok());
    }
}
