//! Persistent state: the registry, per-app records and the install journal.

pub mod app_config;
pub mod atomic;
pub mod config;
pub mod journal;
pub mod paths;

pub use app_config::{AppPaths, AppRecord, SourceKind};
pub use config::{ConfigRegistry, ConfigStore};
pub use journal::TransactionJournal;
pub use paths::StorePaths;
