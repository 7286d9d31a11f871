use rusqlite::{params, Connection};
use simpletodo_core::db::migrations::latest_version;
use simpletodo_core::db::open_db;
use simpletodo_core::{
    JournalService, Recurrence, SqliteLogStore, SqliteTaskStore, Task, TaskListQuery, TaskStore,
};
use std::path::Path;

const V1_SCHEMA: &str = "CREATE TABLE todo_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL,
    timeInMillis INTEGER NOT NULL,
    isMonthly INTEGER NOT NULL,
    remindCount INTEGER NOT NULL,
    isDone INTEGER NOT NULL
);";

const V3_SCHEMA: &str = "CREATE TABLE todo_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL,
    timeInMillis INTEGER NOT NULL,
    isMonthly INTEGER NOT NULL,
    remindCount INTEGER NOT NULL,
    isDone INTEGER NOT NULL,
    remarks TEXT,
    imagePaths TEXT,
    maxRetries INTEGER NOT NULL DEFAULT 3,
    retryIntervalHours INTEGER NOT NULL DEFAULT 1,
    repeatMode INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE app_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    timestamp INTEGER NOT NULL,
    tag TEXT NOT NULL,
    message TEXT NOT NULL
);
CREATE TABLE room_master_table (id INTEGER PRIMARY KEY, identity_hash TEXT);";

fn seed_legacy(path: &Path, schema: &str) -> Connection {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(schema).unwrap();
    conn.execute_batch("PRAGMA user_version = 3;").unwrap();
    conn
}

fn all_tasks(conn: &Connection) -> Vec<Task> {
    SqliteTaskStore::try_new(conn)
        .unwrap()
        .list(&TaskListQuery {
            include_done: true,
            ..TaskListQuery::default()
        })
        .unwrap()
}

fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
        [name],
        |row| row.get::<_, i64>(0),
    )
    .unwrap()
        == 1
}

#[test]
fn imports_v3_rows_and_drops_legacy_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo_database");
    let legacy = seed_legacy(&path, V3_SCHEMA);
    legacy
        .execute(
            "INSERT INTO todo_items
                (name, timeInMillis, isMonthly, remindCount, isDone, remarks, imagePaths,
                 maxRetries, retryIntervalHours, repeatMode)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                "water plants",
                1_000_i64,
                0,
                0,
                0,
                "balcony",
                r#"["/data/img_1.jpg"]"#,
                2,
                4,
                1
            ],
        )
        .unwrap();
    legacy
        .execute(
            "INSERT INTO todo_items
                (name, timeInMillis, isMonthly, remindCount, isDone, remarks, imagePaths,
                 maxRetries, retryIntervalHours, repeatMode)
             VALUES ('pay rent', 2000, 1, 7, 0, NULL, NULL, 3, 1, 0);",
            [],
        )
        .unwrap();
    legacy
        .execute(
            "INSERT INTO todo_items
                (name, timeInMillis, isMonthly, remindCount, isDone, remarks, imagePaths,
                 maxRetries, retryIntervalHours, repeatMode)
             VALUES ('filed taxes', 3000, 1, 0, 1, '', 'not json', 3, 1, 2);",
            [],
        )
        .unwrap();
    legacy
        .execute(
            "INSERT INTO app_logs (timestamp, tag, message) VALUES (10, 'AlarmReceiver', 'fired');",
            [],
        )
        .unwrap();
    drop(legacy);

    let conn = open_db(&path).unwrap();
    assert_eq!(
        conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))
            .unwrap(),
        latest_version()
    );
    assert!(!table_exists(&conn, "todo_items"));
    assert!(!table_exists(&conn, "room_master_table"));

    let tasks = all_tasks(&conn);
    assert_eq!(tasks.len(), 3);

    let plants = &tasks[0];
    assert_eq!(plants.title, "water plants");
    assert_eq!(plants.recurrence, Recurrence::Weekly);
    assert_eq!(plants.note, "balcony");
    assert_eq!(plants.attachments, vec!["/data/img_1.jpg".to_string()]);
    assert_eq!(plants.max_retries, 2);
    assert_eq!(plants.retry_interval_hours, 4);
    assert_eq!(plants.next_reminder_at, Some(1_000));

    let rent = &tasks[1];
    assert_eq!(rent.recurrence, Recurrence::Monthly);
    assert_eq!(rent.retry_count, 3);
    assert_eq!(rent.next_reminder_at, None);
    assert!(rent.note.is_empty());

    let taxes = &tasks[2];
    assert_eq!(taxes.recurrence, Recurrence::Monthly);
    assert!(taxes.done);
    assert!(taxes.attachments.is_empty());
    assert_eq!(taxes.next_reminder_at, None);

    let journal = JournalService::new(SqliteLogStore::try_new(&conn).unwrap());
    let entries = journal.list(None).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].tag, "AlarmReceiver");
}

#[test]
fn imports_v1_rows_with_defaults_for_missing_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo_database");
    let legacy = seed_legacy(&path, V1_SCHEMA);
    legacy
        .execute(
            "INSERT INTO todo_items (name, timeInMillis, isMonthly, remindCount, isDone)
             VALUES ('   ', 500, 1, 0, 0);",
            [],
        )
        .unwrap();
    drop(legacy);

    let conn = open_db(&path).unwrap();
    let tasks = all_tasks(&conn);
    assert_eq!(tasks.len(), 1);

    let task = &tasks[0];
    assert_eq!(task.title, "(untitled)");
    assert_eq!(task.recurrence, Recurrence::Monthly);
    assert_eq!(task.max_retries, 3);
    assert_eq!(task.retry_interval_hours, 1);
    assert_eq!(task.next_reminder_at, Some(500));
    assert!(table_exists(&conn, "app_logs"));
}

#[test]
fn reopening_imported_database_does_not_import_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo_database");
    let legacy = seed_legacy(&path, V1_SCHEMA);
    legacy
        .execute(
            "INSERT INTO todo_items (name, timeInMillis, isMonthly, remindCount, isDone)
             VALUES ('once', 100, 0, 0, 0);",
            [],
        )
        .unwrap();
    drop(legacy);

    drop(open_db(&path).unwrap());
    let conn = open_db(&path).unwrap();
    assert_eq!(all_tasks(&conn).len(), 1);
}

#[test]
fn legacy_table_missing_required_column_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo_database");
    drop(seed_legacy(
        &path,
        "CREATE TABLE todo_items (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    ));

    let err = open_db(&path).unwrap_err();
    assert!(err.to_string().contains("timeInMillis"));
}
