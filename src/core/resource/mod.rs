//! Study discovery: collection, filtering and the ignore-set

pub mod collector;
pub mod filter;
pub mod ignore;
pub mod meta;

pub use collector::ResourceCollector;
pub use filter::ResourceFilter;
pub use ignore::{FileIgnoreStore, IgnoreSet, IgnoreStore};
pub use meta::{parse_meta_study, resolve_study_id, META_STUDY_FILE};
