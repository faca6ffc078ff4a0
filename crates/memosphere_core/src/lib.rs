//! Core domain logic for MemoSphere journal entries.
//! This crate is the single source of truth for entry persistence invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use crate::config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entry::{Entry, EntryDraft, EntryId, EntryType, EntryValidationError};
pub use repo::entry_repo::{EntryRepository, RepoError, RepoResult, SqliteEntryRepository};
pub use service::entry_service::{Clock, EntryPage, EntryService, EntryServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
