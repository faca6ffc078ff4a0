use memosphere_core::db::{open_db, open_db_in_memory};
use memosphere_core::{EntryDraft, EntryService, EntryServiceError, EntryType, SqliteEntryRepository};
use rusqlite::Connection;
use uuid::Uuid;

const T1: i64 = 1_700_000_000_000;
const T2: i64 = 1_800_000_000_000;

fn morning_walk() -> EntryDraft {
    EntryDraft::new(EntryType::Text, "Morning walk", "Sun over the river")
        .with_feelings(["happy"])
        .with_activities(["hiking"])
}

fn count_rows(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn create_assigns_uuid_and_clock_date() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
    let mut service = EntryService::with_clock(repo, || T1);

    let created = service.create(morning_walk()).unwrap();
    assert!(Uuid::parse_str(&created.id).is_ok());
    assert_eq!(created.date, T1);

    let loaded = service.get(&created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.title, "Morning walk");
    assert_eq!(loaded.feelings, vec!["happy".to_string()]);
    assert_eq!(loaded.activities, vec!["hiking".to_string()]);
}

#[test]
fn create_honors_caller_id_and_treats_blank_as_absent() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
    let mut service = EntryService::with_clock(repo, || T1);

    let named = service.create(morning_walk().with_id("walk-1")).unwrap();
    assert_eq!(named.id, "walk-1");

    let blank = service.create(morning_walk().with_id("   ")).unwrap();
    assert!(Uuid::parse_str(&blank.id).is_ok());
}

#[test]
fn create_rejects_existing_id_without_touching_it() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
    let mut service = EntryService::with_clock(repo, || T1);

    let original = service.create(morning_walk().with_id("walk-1")).unwrap();
    let err = service
        .create(EntryDraft::new(EntryType::Audio, "other", "x").with_id("walk-1"))
        .unwrap_err();
    assert!(matches!(err, EntryServiceError::AlreadyExists(ref id) if id == "walk-1"));
    assert_eq!(service.get("walk-1").unwrap().unwrap(), original);
}

#[test]
fn create_rejects_id_written_through_another_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.db");
    let mut writer = open_db(&path).unwrap();
    let mut late = open_db(&path).unwrap();

    let original = {
        let repo = SqliteEntryRepository::try_new(&mut writer).unwrap();
        let mut service = EntryService::with_clock(repo, || T1);
        service.create(morning_walk().with_id("shared")).unwrap()
    };

    let repo = SqliteEntryRepository::try_new(&mut late).unwrap();
    let mut service = EntryService::with_clock(repo, || T2);
    let err = service
        .create(
            EntryDraft::new(EntryType::Image, "other", "x.png")
                .with_id("shared")
                .with_feelings(["smug", "sleepy"]),
        )
        .unwrap_err();
    assert!(matches!(err, EntryServiceError::AlreadyExists(ref id) if id == "shared"));
    assert_eq!(service.get("shared").unwrap().unwrap(), original);

    assert_eq!(
        count_rows(&writer, "SELECT COUNT(*) FROM entry_feelings WHERE entry_id = 'shared';"),
        1
    );
}

#[test]
fn update_replaces_fields_and_preserves_original_date() {
    let mut conn = open_db_in_memory().unwrap();
    let id = {
        let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
        let mut service = EntryService::with_clock(repo, || T1);
        service.create(morning_walk()).unwrap().id
    };

    let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
    let mut service = EntryService::with_clock(repo, || T2);
    let payload = EntryDraft::new(EntryType::Image, "Evening swim", "lake.jpg")
        .with_id("someone-else")
        .with_feelings(["cold", "alive"]);
    let updated = service.update(&id, payload).unwrap();

    assert_eq!(updated.id, id);
    assert_eq!(updated.date, T1);
    assert_eq!(updated.kind, EntryType::Image);
    assert_eq!(updated.title, "Evening swim");
    assert_eq!(updated.content, "lake.jpg");
    assert_eq!(updated.feelings, vec!["cold".to_string(), "alive".to_string()]);
    assert!(updated.activities.is_empty());

    assert_eq!(service.get(&id).unwrap().unwrap(), updated);
    assert!(service.get("someone-else").unwrap().is_none());
}

#[test]
fn update_keeps_date_even_when_store_row_was_backdated() {
    let mut conn = open_db_in_memory().unwrap();
    let id = {
        let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
        let mut service = EntryService::new(repo);
        service.create(morning_walk()).unwrap().id
    };
    conn.execute("UPDATE entries SET date = 42 WHERE id = ?1;", [id.as_str()])
        .unwrap();

    let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
    let mut service = EntryService::new(repo);
    let updated = service
        .update(&id, EntryDraft::new(EntryType::Text, "edited", "edited"))
        .unwrap();
    assert_eq!(updated.date, 42);
}

#[test]
fn not_found_semantics_differ_between_reads_and_writes() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
    let mut service = EntryService::new(repo);

    assert!(service.get("nope").unwrap().is_none());

    let delete_err = service.delete("nope").unwrap_err();
    assert!(matches!(delete_err, EntryServiceError::EntryNotFound(ref id) if id == "nope"));

    let update_err = service.update("nope", morning_walk()).unwrap_err();
    assert!(matches!(update_err, EntryServiceError::EntryNotFound(ref id) if id == "nope"));
    assert!(service.list_all().unwrap().is_empty());
}

#[test]
fn delete_removes_entry_and_tag_rows() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
        let mut service = EntryService::new(repo);
        let created = service.create(morning_walk()).unwrap();
        service.delete(&created.id).unwrap();
        assert!(service.get(&created.id).unwrap().is_none());
    }

    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM entries;"), 0);
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM entry_feelings;"), 0);
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM entry_activities;"), 0);
}

#[test]
fn list_all_returns_most_recent_first() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
        let mut service = EntryService::with_clock(repo, || T1);
        service.create(morning_walk().with_id("older")).unwrap();
    }
    {
        let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
        let mut service = EntryService::with_clock(repo, || T2);
        service.create(morning_walk().with_id("newer")).unwrap();
    }

    let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
    let service = EntryService::new(repo);
    let listed = service.list_all().unwrap();
    let ids: Vec<&str> = listed.iter().map(|entry| entry.id.as_str()).collect();
    assert_eq!(ids, vec!["newer", "older"]);
}

#[test]
fn list_page_reports_totals_and_rejects_zero_size() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteEntryRepository::try_new(&mut conn).unwrap();
    let mut service = EntryService::with_clock(repo, || T1);
    for idx in 0..3 {
        service
            .create(morning_walk().with_id(format!("e-{idx}")))
            .unwrap();
    }

    let page = service.list_page(2, 2).unwrap();
    assert_eq!(page.page_number, 2);
    assert_eq!(page.page_size, 2);
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, "e-2");

    let err = service.list_page(1, 0).unwrap_err();
    assert!(matches!(err, EntryServiceError::InvalidArgument(_)));
}
