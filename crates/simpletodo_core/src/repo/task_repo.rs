//! Task store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the local-store port used by reminder scheduling.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Task::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `list_due` only returns open tasks with a pending reminder cursor.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::task::{EpochMs, Recurrence, Task, TaskId, TaskValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    due_at,
    recurrence,
    note,
    attachments,
    is_done,
    retry_count,
    max_retries,
    retry_interval_hours,
    next_reminder_at
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task and journal persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
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

/// Query options for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskListQuery {
    pub include_done: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Local-store port for tasks.
pub trait TaskStore {
    fn insert(&self, task: &Task) -> RepoResult<TaskId>;
    fn update(&self, task: &Task) -> RepoResult<()>;
    fn get(&self, id: TaskId) -> RepoResult<Option<Task>>;
    fn delete(&self, id: TaskId) -> RepoResult<()>;
    /// Open tasks whose reminder cursor is at or before `before`, earliest first.
    fn list_due(&self, before: EpochMs) -> RepoResult<Vec<Task>>;
    /// Tasks ordered by due time ascending.
    fn list(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
}

/// SQLite-backed task store.
pub struct SqliteTaskStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    ///
    /// # Errors
    /// - `RepoError::InvalidData` when the connection was not migrated.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TaskStore for SqliteTaskStore<'_> {
    fn insert(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;
        insert_task_row(self.conn, task)?;
        Ok(task.id)
    }

    fn update(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?1,
                due_at = ?2,
                recurrence = ?3,
                note = ?4,
                attachments = ?5,
                is_done = ?6,
                retry_count = ?7,
                max_retries = ?8,
                retry_interval_hours = ?9,
                next_reminder_at = ?10,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?11;",
            params![
                task.title.as_str(),
                task.due_at,
                task.recurrence.as_str(),
                task.note.as_str(),
                attachments_to_db(&task.attachments)?,
                bool_to_int(task.done),
                task.retry_count,
                task.max_retries,
                task.retry_interval_hours,
                task.next_reminder_at,
                task.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(task.id));
        }
        Ok(())
    }

    fn get(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn delete(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn list_due(&self, before: EpochMs) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE is_done = 0
               AND next_reminder_at IS NOT NULL
               AND next_reminder_at <= ?1
             ORDER BY next_reminder_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([before])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn list(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_done {
            sql.push_str(" AND is_done = 0");
        }

        sql.push_str(" ORDER BY due_at ASC, id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }
}

/// Inserts one task row without validation.
///
/// Shared with the legacy import, which runs inside its own transaction.
pub(crate) fn insert_task_row(conn: &Connection, task: &Task) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO tasks (
            id,
            title,
            due_at,
            recurrence,
            note,
            attachments,
            is_done,
            retry_count,
            max_retries,
            retry_interval_hours,
            next_reminder_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
        params![
            task.id.to_string(),
            task.title.as_str(),
            task.due_at,
            task.recurrence.as_str(),
            task.note.as_str(),
            attachments_to_db(&task.attachments)?,
            bool_to_int(task.done),
            task.retry_count,
            task.max_retries,
            task.retry_interval_hours,
            task.next_reminder_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let version = current_user_version(conn)?;
    if version != latest_version() {
        return Err(RepoError::InvalidData(format!(
            "connection schema version {version} does not match expected {}",
            latest_version()
        )));
    }
    Ok(())
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in tasks.id"))
    })?;

    let recurrence_text: String = row.get("recurrence")?;
    let recurrence = Recurrence::parse(&recurrence_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid recurrence `{recurrence_text}` in tasks.recurrence"
        ))
    })?;

    let attachments_text: String = row.get("attachments")?;
    let attachments = serde_json::from_str::<Vec<String>>(&attachments_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid tasks.attachments for {id}: {err}"))
    })?;

    let done = match row.get::<_, i64>("is_done")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_done value `{other}` in tasks.is_done"
            )));
        }
    };

    let task = Task {
        id,
        title: row.get("title")?,
        due_at: row.get("due_at")?,
        recurrence,
        note: row.get("note")?,
        attachments,
        done,
        retry_count: row.get("retry_count")?,
        max_retries: row.get("max_retries")?,
        retry_interval_hours: row.get("retry_interval_hours")?,
        next_reminder_at: row.get("next_reminder_at")?,
    };
    task.validate()?;
    Ok(task)
}

fn attachments_to_db(attachments: &[String]) -> RepoResult<String> {
    serde_json::to_string(attachments)
        .map_err(|err| RepoError::InvalidData(format!("attachments not serializable: {err}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

impl<T: TaskStore + ?Sized> TaskStore for &T {
    fn insert(&self, task: &Task) -> RepoResult<TaskId> {
        (**self).insert(task)
    }

    fn update(&self, task: &Task) -> RepoResult<()> {
        (**self).update(task)
    }

    fn get(&self, id: TaskId) -> RepoResult<Option<Task>> {
        (**self).get(id)
    }

    fn delete(&self, id: TaskId) -> RepoResult<()> {
        (**self).delete(id)
    }

    fn list_due(&self, before: EpochMs) -> RepoResult<Vec<Task>> {
        (**self).list_due(before)
    }

    fn list(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        (**self).list(query)
    }
}
