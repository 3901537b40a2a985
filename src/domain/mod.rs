//! Domain models and types for Stager.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Resources** ([`Resource`]): backend-neutral handles with a canonical URL
//! - **Studies** ([`Study`], [`StudyId`]): the unit of work a scan discovers
//! - **Step outcomes** ([`ExitStatus`], [`ValidationLevel`])
//! - **Error types** ([`StagerError`], [`CommandError`]) and the [`Result`] alias
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, StagerError>`]:
//!
//! ```rust
//! use stager::domain::{Resource, Result};
//!
//! fn example() -> Result<()> {
//!     let location = Resource::parse("s3://bucket/incoming")?;
//!     assert_eq!(location.url(), "s3://bucket/incoming");
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod errors;
pub mod resource;
pub mod result;
pub mod status;
pub mod study;

// Re-export commonly used types for convenience
pub use errors::{CommandError, StagerError};
pub use resource::{Resource, ResourceKind, Scheme};
pub use result::Result;
pub use status::{has_study_passed, ExitStatus, ValidationLevel};
pub use study::{scan_timestamp, Study, StudyId};
