//! Subprocess execution and process-level locking

pub mod lock;
pub mod runner;

pub use lock::{AdvisoryLock, LockGuard, PortLock};
pub use runner::{CommandRunner, CommandSpec, ProcessRunner};
