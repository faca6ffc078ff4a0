//! Connection bootstrap utilities for SQLite.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have [`UNICODE_LOWER_FN`] registered.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{during, DbError, DbResult, DbStage};
use log::{error, info};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQL name of the Unicode-aware lowercase scalar.
///
/// Built-in `lower()` only folds ASCII, so text searches must use this one
/// to agree with Rust's `str::to_lowercase`.
pub const UNICODE_LOWER_FN: &str = "unicode_lower";

/// Opens a SQLite database file and applies all pending migrations.
///
/// The file is created when missing. Emits `db_open` events with duration
/// and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path))
}

/// Opens a private in-memory database with the full schema applied.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

/// Registers the scalar functions entry queries rely on.
///
/// Safe to call again on the same connection; registration replaces.
pub fn register_sql_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value = ctx.get::<Option<String>>(0)?;
            Ok(value.map(|text| text.to_lowercase()))
        },
    )
}

fn open_with(
    mode: &'static str,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let result = connect()
        .map_err(during(DbStage::Open))
        .and_then(|mut conn| {
            bootstrap_connection(&mut conn)?;
            Ok(conn)
        });

    match result {
        Ok(conn) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            let error_code = err.stage().map_or("db_error", DbStage::error_code);
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code={error_code} error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> Result<(), DbError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(during(DbStage::Configure))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(during(DbStage::Configure))?;
    register_sql_functions(conn).map_err(during(DbStage::Configure))?;
    apply_migrations(conn)
}
