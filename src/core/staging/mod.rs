//! Staging area: directory layout, extraction and publishing

pub mod directory;
pub mod extractor;
pub mod publisher;

pub use directory::{DirectoryCreator, StudyArtifacts};
pub use extractor::{ExtractionResult, Extractor};
pub use publisher::Publisher;
