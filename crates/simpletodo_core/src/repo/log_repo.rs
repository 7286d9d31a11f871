//! Diagnostic journal store contract and SQLite implementation.
//!
//! # Invariants
//! - Entries are append-only; the only removal path is `clear`.
//! - Listing is newest first (`timestamp DESC, id DESC`).

use crate::model::log_entry::LogEntry;
use crate::model::task::EpochMs;
use crate::repo::task_repo::{ensure_schema_ready, RepoResult};
use rusqlite::{params, Connection};

/// Journal store port.
pub trait LogStore {
    fn append(&self, tag: &str, message: &str, timestamp: EpochMs) -> RepoResult<LogEntry>;
    fn list(&self, limit: u32) -> RepoResult<Vec<LogEntry>>;
    /// Removes every entry and returns how many were deleted.
    fn clear(&self) -> RepoResult<usize>;
}

/// SQLite-backed journal store over the `app_logs` table.
pub struct SqliteLogStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLogStore<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl LogStore for SqliteLogStore<'_> {
    fn append(&self, tag: &str, message: &str, timestamp: EpochMs) -> RepoResult<LogEntry> {
        self.conn.execute(
            "INSERT INTO app_logs (timestamp, tag, message) VALUES (?1, ?2, ?3);",
            params![timestamp, tag, message],
        )?;
        Ok(LogEntry {
            id: self.conn.last_insert_rowid(),
            timestamp,
            tag: tag.to_string(),
            message: message.to_string(),
        })
    }

    fn list(&self, limit: u32) -> RepoResult<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, tag, message
             FROM app_logs
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1;",
        )?;
        let entries = stmt
            .query_map([i64::from(limit)], |row| {
                Ok(LogEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    tag: row.get(2)?,
                    message: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn clear(&self) -> RepoResult<usize> {
        let removed = self.conn.execute("DELETE FROM app_logs;", [])?;
        Ok(removed)
    }
}

impl<T: LogStore + ?Sized> LogStore for &T {
    fn append(&self, tag: &str, message: &str, timestamp: EpochMs) -> RepoResult<LogEntry> {
        (**self).append(tag, message, timestamp)
    }

    fn list(&self, limit: u32) -> RepoResult<Vec<LogEntry>> {
        (**self).list(limit)
    }

    fn clear(&self) -> RepoResult<usize> {
        (**self).clear()
    }
}
