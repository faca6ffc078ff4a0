//! Entry repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide transactional save/delete and read/search/page queries over
//!   entry aggregates.
//! - Materialize tag sets by row iteration over the child tables.
//!
//! # Invariants
//! - `save` replaces both tag sets of an entry in the same IMMEDIATE
//!   transaction as the primary record write.
//! - `save` never rewrites the `date` of an existing primary record.
//! - `insert` never touches an existing entry; a primary-key conflict is
//!   reported as `AlreadyExists` and the transaction rolls back.
//! - `delete_by_id` removes child rows and the primary record together, or
//!   nothing at all.
//! - Listings are ordered by `date DESC, id ASC`.

use crate::db::{register_sql_functions, DbError, UNICODE_LOWER_FN};
use crate::model::entry::{Entry, EntryId, EntryType, EntryValidationError};
use log::debug;
use rusqlite::{params, Connection, Params, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ENTRY_SELECT_SQL: &str = "SELECT
    id,
    type,
    content,
    title,
    date
FROM entries";

const ENTRY_ORDER_SQL: &str = "ORDER BY date DESC, id ASC";

const ENTRY_INSERT_SQL: &str = "INSERT INTO entries (id, type, content, date, title)
     VALUES (?1, ?2, ?3, ?4, ?5)";

const ENTRY_UPSERT_SQL: &str = "INSERT INTO entries (id, type, content, date, title)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (id) DO UPDATE SET
        type = excluded.type,
        content = excluded.content,
        title = excluded.title";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entry persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Storage-backend failure. Nothing from the failed write is visible.
    Db(DbError),
    /// No primary record with this id.
    NotFound(EntryId),
    /// An insert-only write hit an existing primary record.
    AlreadyExists(EntryId),
    /// Caller-supplied argument is out of range.
    InvalidArgument(String),
    Validation(EntryValidationError),
    /// Persisted row cannot be decoded into an `Entry`.
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "entry not found: {id}"),
            Self::AlreadyExists(id) => write!(f, "entry already exists: {id}"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted entry data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "entry repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "entry repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound(_)
            | Self::AlreadyExists(_)
            | Self::InvalidArgument(_)
            | Self::InvalidData(_)
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<EntryValidationError> for RepoError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Repository interface for the entry store.
pub trait EntryRepository {
    /// Writes the primary record and replaces both tag sets atomically.
    ///
    /// Returns the entry as persisted.
    fn save(&mut self, entry: &Entry) -> RepoResult<Entry>;
    /// Like `save`, but fails with `AlreadyExists` instead of replacing an
    /// existing entry.
    fn insert(&mut self, entry: &Entry) -> RepoResult<Entry>;
    /// Gets one entry. Absence is `Ok(None)`, not an error.
    fn find_by_id(&self, id: &str) -> RepoResult<Option<Entry>>;
    /// Lists all entries, most recent first.
    fn find_all(&self) -> RepoResult<Vec<Entry>>;
    /// Case-insensitive substring search over title, content and tags.
    fn search(&self, query: &str) -> RepoResult<Vec<Entry>>;
    /// Deletes one entry and its tag rows.
    fn delete_by_id(&mut self, id: &str) -> RepoResult<()>;
    /// Lists one 1-indexed page in `find_all` order.
    fn find_page(&self, page_number: u32, page_size: u32) -> RepoResult<Vec<Entry>>;
    /// Returns the number of stored entries.
    fn count(&self) -> RepoResult<u64>;
}

/// One child association table linking entry ids to tag strings.
#[derive(Debug, Clone, Copy)]
struct TagTable {
    table: &'static str,
    column: &'static str,
}

const FEELINGS: TagTable = TagTable {
    table: "entry_feelings",
    column: "feeling",
};

const ACTIVITIES: TagTable = TagTable {
    table: "entry_activities",
    column: "activity",
};

impl TagTable {
    fn clear(self, conn: &Connection, entry_id: &str) -> rusqlite::Result<usize> {
        conn.execute(
            &format!("DELETE FROM {} WHERE entry_id = ?1;", self.table),
            [entry_id],
        )
    }

    fn replace(self, conn: &Connection, entry_id: &str, tags: &[String]) -> rusqlite::Result<()> {
        self.clear(conn, entry_id)?;
        let mut stmt = conn.prepare_cached(&format!(
            "INSERT INTO {} (entry_id, {}) VALUES (?1, ?2);",
            self.table, self.column
        ))?;
        for tag in tags {
            stmt.execute(params![entry_id, tag])?;
        }
        Ok(())
    }

    fn load(self, conn: &Connection, entry_id: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM {} WHERE entry_id = ?1 ORDER BY rowid ASC;",
            self.column, self.table
        ))?;
        let tags = stmt.query_map([entry_id], |row| row.get::<_, String>(0))?;
        tags.collect()
    }
}

/// SQLite-backed entry store.
pub struct SqliteEntryRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteEntryRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    ///
    /// Registers the SQL functions search depends on, so connections not
    /// opened through `open_db` work too.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_entry_connection_ready(conn)?;
        register_sql_functions(conn)?;
        Ok(Self { conn })
    }

    /// Read-only access to the underlying connection.
    pub fn connection(&self) -> &Connection {
        self.conn
    }

    /// Runs `primary_sql` for the primary record, then replaces both tag
    /// sets and reads the entry back, all in one IMMEDIATE transaction.
    fn write_entry(&mut self, primary_sql: &str, entry: &Entry) -> RepoResult<Entry> {
        entry.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            primary_sql,
            params![
                entry.id.as_str(),
                entry.kind.as_str(),
                entry.content.as_str(),
                entry.date,
                entry.title.as_str(),
            ],
        )?;
        FEELINGS.replace(&tx, &entry.id, &entry.feelings)?;
        ACTIVITIES.replace(&tx, &entry.id, &entry.activities)?;

        let saved = load_entry(&tx, &entry.id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("entry `{}` missing after save", entry.id))
        })?;
        tx.commit()?;

        debug!(
            "event=entry_save module=repo status=ok feelings={} activities={}",
            saved.feelings.len(),
            saved.activities.len()
        );
        Ok(saved)
    }
}

impl EntryRepository for SqliteEntryRepository<'_> {
    fn save(&mut self, entry: &Entry) -> RepoResult<Entry> {
        self.write_entry(ENTRY_UPSERT_SQL, entry)
    }

    fn insert(&mut self, entry: &Entry) -> RepoResult<Entry> {
        self.write_entry(ENTRY_INSERT_SQL, entry).map_err(|err| {
            if is_primary_key_conflict(&err) {
                RepoError::AlreadyExists(entry.id.clone())
            } else {
                err
            }
        })
    }

    fn find_by_id(&self, id: &str) -> RepoResult<Option<Entry>> {
        load_entry(self.conn, id)
    }

    fn find_all(&self) -> RepoResult<Vec<Entry>> {
        query_entries(
            self.conn,
            &format!("{ENTRY_SELECT_SQL} {ENTRY_ORDER_SQL};"),
            [],
        )
    }

    fn search(&self, query: &str) -> RepoResult<Vec<Entry>> {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return self.find_all();
        }

        // instr() keeps `%` and `_` literal, unlike LIKE.
        let lower = UNICODE_LOWER_FN;
        query_entries(
            self.conn,
            &format!(
                "{ENTRY_SELECT_SQL}
                 WHERE instr({lower}(title), ?1) > 0
                    OR instr({lower}(content), ?1) > 0
                    OR EXISTS (
                        SELECT 1
                        FROM entry_feelings f
                        WHERE f.entry_id = entries.id
                          AND instr({lower}(f.feeling), ?1) > 0
                    )
                    OR EXISTS (
                        SELECT 1
                        FROM entry_activities a
                        WHERE a.entry_id = entries.id
                          AND instr({lower}(a.activity), ?1) > 0
                    )
                 {ENTRY_ORDER_SQL};"
            ),
            [needle.as_str()],
        )
    }

    fn delete_by_id(&mut self, id: &str) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let feelings = FEELINGS.clear(&tx, id)?;
        let activities = ACTIVITIES.clear(&tx, id)?;
        let changed = tx.execute("DELETE FROM entries WHERE id = ?1;", [id])?;

        if changed == 0 {
            // Dropping `tx` rolls back the child deletes.
            return Err(RepoError::NotFound(id.to_string()));
        }

        tx.commit()?;
        debug!(
            "event=entry_delete module=repo status=ok feelings={feelings} activities={activities}"
        );
        Ok(())
    }

    fn find_page(&self, page_number: u32, page_size: u32) -> RepoResult<Vec<Entry>> {
        let (limit, offset) = page_bounds(page_number, page_size)?;
        query_entries(
            self.conn,
            &format!("{ENTRY_SELECT_SQL} {ENTRY_ORDER_SQL} LIMIT ?1 OFFSET ?2;"),
            params![limit, offset],
        )
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative entry count `{count}`")))
    }
}

/// Converts a 1-indexed page request into SQL `LIMIT`/`OFFSET` values.
///
/// Zero page numbers or sizes are rejected rather than clamped.
pub fn page_bounds(page_number: u32, page_size: u32) -> RepoResult<(i64, i64)> {
    if page_number == 0 {
        return Err(RepoError::InvalidArgument(
            "page_number must be at least 1".to_string(),
        ));
    }
    if page_size == 0 {
        return Err(RepoError::InvalidArgument(
            "page_size must be at least 1".to_string(),
        ));
    }

    let offset = u64::from(page_number - 1) * u64::from(page_size);
    let offset = i64::try_from(offset).map_err(|_| {
        RepoError::InvalidArgument(format!(
            "page {page_number} of size {page_size} is out of range"
        ))
    })?;
    Ok((i64::from(page_size), offset))
}

fn is_primary_key_conflict(err: &RepoError) -> bool {
    matches!(
        err,
        RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(failure, _)))
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn load_entry(conn: &Connection, id: &str) -> RepoResult<Option<Entry>> {
    let mut entries = query_entries(
        conn,
        &format!("{ENTRY_SELECT_SQL} WHERE id = ?1;"),
        [id],
    )?;
    Ok(entries.pop())
}

fn query_entries<P: Params>(conn: &Connection, sql: &str, params: P) -> RepoResult<Vec<Entry>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        entries.push(parse_entry_row(conn, row)?);
    }
    Ok(entries)
}

fn parse_entry_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Entry> {
    let id: String = row.get("id")?;
    let type_text: String = row.get("type")?;
    let kind = EntryType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid entry type `{type_text}` in entries.type"))
    })?;

    let feelings = FEELINGS.load(conn, &id)?;
    let activities = ACTIVITIES.load(conn, &id)?;
    Ok(Entry {
        kind,
        content: row.get("content")?,
        title: row.get("title")?,
        date: row.get("date")?,
        feelings,
        activities,
        id,
    })
}

fn ensure_entry_connection_ready(conn: &Connection) -> RepoResult<()> {
    const REQUIRED: &[(&str, &[&str])] = &[
        ("entries", &["id", "type", "content", "date", "title"]),
        ("entry_feelings", &["entry_id", "feeling"]),
        ("entry_activities", &["entry_id", "activity"]),
    ];

    for &(table, columns) in REQUIRED {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for column in columns.iter().copied() {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
