//! One-time import of legacy `todo_items` rows.
//!
//! # Responsibility
//! - Detect databases written by the previous app generation.
//! - Convert every legacy row into the canonical `tasks` shape once.
//!
//! # Invariants
//! - The legacy dual recurrence fields (`isMonthly`, `repeatMode`) never
//!   reach the domain model; they collapse into `Recurrence` here.
//! - Import and legacy table drop commit in one transaction.
//! - Imported rows never carry a pending retry; only untouched open rows
//!   get a reminder cursor at their due time.

use crate::db::{DbError, DbResult};
use crate::model::task::{Recurrence, Task, MAX_RETRIES_LIMIT};
use crate::repo::task_repo::insert_task_row;
use log::{info, warn};
use rusqlite::Connection;
use std::collections::HashSet;
use uuid::Uuid;

const LEGACY_TABLE: &str = "todo_items";
const REQUIRED_COLUMNS: &[&str] = &["id", "name", "timeInMillis", "remindCount", "isDone"];
const UNTITLED: &str = "(untitled)";

struct LegacyRow {
    legacy_id: i64,
    name: String,
    time_in_millis: i64,
    is_monthly: bool,
    remind_count: i64,
    is_done: bool,
    remarks: String,
    image_paths: String,
    max_retries: i64,
    retry_interval_hours: i64,
    repeat_mode: Option<i64>,
}

/// Resets the schema version stamped by the legacy ORM.
///
/// Legacy databases report their own `user_version`, which is unrelated to
/// this crate's migration registry. Returns `true` when a legacy database
/// was detected.
pub fn reset_room_version_if_legacy(conn: &Connection) -> DbResult<bool> {
    if !table_exists(conn, LEGACY_TABLE)? || table_exists(conn, "tasks")? {
        return Ok(false);
    }
    conn.execute_batch("PRAGMA user_version = 0;")?;
    info!("event=legacy_detect module=db status=ok table={LEGACY_TABLE}");
    Ok(true)
}

/// Imports legacy rows into `tasks` and drops the legacy tables.
///
/// Returns the number of imported rows; `0` when no legacy table exists.
///
/// # Errors
/// - `DbError::LegacyImport` when a required legacy column is missing.
/// - `DbError::Sqlite` on any read/write failure; nothing is committed.
pub fn import_legacy_tasks(conn: &mut Connection) -> DbResult<usize> {
    if !table_exists(conn, LEGACY_TABLE)? {
        return Ok(0);
    }

    let columns = legacy_columns(conn)?;
    for required in REQUIRED_COLUMNS {
        if !columns.contains(*required) {
            return Err(DbError::LegacyImport(format!(
                "table `{LEGACY_TABLE}` is missing column `{required}`"
            )));
        }
    }

    let tx = conn.transaction()?;
    let rows = read_legacy_rows(&tx, &columns)?;
    let imported = rows.len();
    for row in rows {
        let task = row.into_task();
        insert_task_row(&tx, &task).map_err(|err| DbError::LegacyImport(err.to_string()))?;
    }
    tx.execute_batch(&format!(
        "DROP TABLE {LEGACY_TABLE};
         DROP TABLE IF EXISTS room_master_table;"
    ))?;
    tx.commit()?;

    info!("event=legacy_import module=db status=ok imported={imported}");
    Ok(imported)
}

fn read_legacy_rows(conn: &Connection, columns: &HashSet<String>) -> DbResult<Vec<LegacyRow>> {
    let sql = format!(
        "SELECT
            id,
            name,
            timeInMillis,
            {is_monthly},
            remindCount,
            isDone,
            {remarks},
            {image_paths},
            {max_retries},
            {retry_interval_hours},
            {repeat_mode}
         FROM {LEGACY_TABLE}
         ORDER BY id ASC;",
        is_monthly = column_or(columns, "isMonthly", "0"),
        remarks = column_or(columns, "remarks", "''"),
        image_paths = column_or(columns, "imagePaths", "'[]'"),
        max_retries = column_or(columns, "maxRetries", "3"),
        retry_interval_hours = column_or(columns, "retryIntervalHours", "1"),
        repeat_mode = column_or(columns, "repeatMode", "NULL"),
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(LegacyRow {
            legacy_id: row.get(0)?,
            name: row.get(1)?,
            time_in_millis: row.get(2)?,
            is_monthly: row.get::<_, i64>(3)? != 0,
            remind_count: row.get(4)?,
            is_done: row.get::<_, i64>(5)? != 0,
            remarks: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            image_paths: row
                .get::<_, Option<String>>(7)?
                .unwrap_or_else(|| "[]".to_string()),
            max_retries: row.get(8)?,
            retry_interval_hours: row.get(9)?,
            repeat_mode: row.get(10)?,
        });
    }
    Ok(out)
}

impl LegacyRow {
    fn into_task(self) -> Task {
        let title = if self.name.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            self.name.trim().to_string()
        };
        let mut task = Task::with_id(Uuid::new_v4(), title, self.time_in_millis);

        task.recurrence = Recurrence::from_legacy(self.is_monthly, self.repeat_mode);
        task.note = self.remarks;
        task.attachments = match serde_json::from_str::<Vec<String>>(&self.image_paths) {
            Ok(paths) => paths,
            Err(_) => {
                warn!(
                    "event=legacy_import module=db status=skip legacy_id={} reason=invalid_image_paths",
                    self.legacy_id
                );
                Vec::new()
            }
        };
        task.max_retries = clamp_u32(self.max_retries, 0, MAX_RETRIES_LIMIT);
        task.retry_interval_hours = clamp_u32(self.retry_interval_hours, 1, u32::MAX);
        task.retry_count = clamp_u32(self.remind_count, 0, task.max_retries);
        task.done = self.is_done;
        task.next_reminder_at = if !task.done && task.retry_count == 0 {
            Some(task.due_at)
        } else {
            None
        };
        task
    }
}

fn clamp_u32(value: i64, min: u32, max: u32) -> u32 {
    let clamped = value.clamp(i64::from(min), i64::from(max));
    u32::try_from(clamped).unwrap_or(min)
}

fn column_or(columns: &HashSet<String>, name: &str, fallback: &str) -> String {
    if columns.contains(name) {
        name.to_string()
    } else {
        format!("{fallback} AS {name}")
    }
}

fn legacy_columns(conn: &Connection) -> DbResult<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({LEGACY_TABLE});"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(names)
}

fn table_exists(conn: &Connection, table_name: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [table_name],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[cfg(test)]
mod tests {
    use super::clamp_u32;

    #[test]
    fn clamp_handles_negative_and_oversized_values() {
        assert_eq!(clamp_u32(-3, 0, 5), 0);
        assert_eq!(clamp_u32(9, 0, 5), 5);
        assert_eq!(clamp_u32(0, 1, u32::MAX), 1);
        assert_eq!(clamp_u32(4, 1, u32::MAX), 4);
    }
}
