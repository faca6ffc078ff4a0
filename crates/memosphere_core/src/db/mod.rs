//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure the SQLite connection that backs the entry store.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No entry data is read or written before migrations succeed.
//! - Connections are explicit handles owned by the caller; there is no
//!   process-wide data source.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, register_sql_functions, UNICODE_LOWER_FN};

pub type DbResult<T> = Result<T, DbError>;

/// Connection setup phase, reported by errors and `db_open` log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbStage {
    /// Opening the file or in-memory database.
    Open,
    /// Pragmas, busy timeout and SQL function registration.
    Configure,
    /// Schema migrations.
    Migrate,
}

impl DbStage {
    /// Stable `error_code` value used in log events.
    pub fn error_code(self) -> &'static str {
        match self {
            Self::Open => "db_open_failed",
            Self::Configure => "db_configure_failed",
            Self::Migrate => "db_migrate_failed",
        }
    }
}

impl Display for DbStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Configure => "configure",
            Self::Migrate => "migrate",
        })
    }
}

/// Storage-backend failure.
#[derive(Debug)]
pub enum DbError {
    /// Statement failure on a ready connection.
    Sqlite(rusqlite::Error),
    /// Failure while bringing a connection up.
    Setup {
        stage: DbStage,
        source: rusqlite::Error,
    },
    /// The database was written by a newer schema than this binary knows.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// Setup phase that failed, or `None` for statement failures.
    pub fn stage(&self) -> Option<DbStage> {
        match self {
            Self::Sqlite(_) => None,
            Self::Setup { stage, .. } => Some(*stage),
            Self::UnsupportedSchemaVersion { .. } => Some(DbStage::Migrate),
        }
    }
}

/// Returns a mapper tagging a rusqlite failure with its setup phase.
pub(crate) fn during(stage: DbStage) -> impl FnOnce(rusqlite::Error) -> DbError {
    move |source| DbError::Setup { stage, source }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Setup { stage, source } => write!(f, "database {stage} failed: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Setup { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
