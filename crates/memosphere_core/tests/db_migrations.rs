use memosphere_core::db::migrations::latest_version;
use memosphere_core::db::{open_db, open_db_in_memory, DbError, DbStage};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "entries");
    assert_table_exists(&conn, "entry_feelings");
    assert_table_exists(&conn, "entry_activities");
}

#[test]
fn opened_connection_enforces_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = conn
        .execute(
            "INSERT INTO entry_feelings (entry_id, feeling) VALUES ('ghost', 'happy');",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().to_lowercase().contains("foreign key"));
}

#[test]
fn entry_type_column_rejects_unknown_literals() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO entries (id, type, content, date, title)
         VALUES ('e-1', 'VIDEO', '', 0, '');",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memosphere.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO entries (id, type, content, date, title)
             VALUES ('kept', 'TEXT', 'body', 1, 'title');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM entries;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn opening_path_in_missing_directory_fails_at_open_stage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("memosphere.db");

    let err = open_db(&path).unwrap_err();
    assert_eq!(err.stage(), Some(DbStage::Open));
    assert!(matches!(
        err,
        DbError::Setup {
            stage: DbStage::Open,
            ..
        }
    ));
    assert!(err.to_string().starts_with("database open failed:"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn incompatible_existing_table_fails_at_migrate_stage_and_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE entries (id TEXT PRIMARY KEY, body TEXT);")
        .unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert_eq!(err.stage(), Some(DbStage::Migrate));
    assert_eq!(DbStage::Migrate.error_code(), "db_migrate_failed");
    assert!(err.to_string().starts_with("database migrate failed:"));

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 0);
    let feelings_table: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'entry_feelings';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(feelings_table, 0);
}

#[test]
fn newer_schema_version_is_reported_as_migrate_stage() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();

    let err = memosphere_core::db::migrations::apply_migrations(&mut conn).unwrap_err();
    assert_eq!(err.stage(), Some(DbStage::Migrate));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
