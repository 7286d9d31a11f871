//! Diagnostic journal use-case service.
//!
//! # Responsibility
//! - Record short diagnostic lines for the host's log screen.
//! - Normalize list limits and sanitize stored text.
//!
//! # Invariants
//! - Stored tags and messages are single-line and length-capped.

use crate::logging::sanitize_message;
use crate::model::log_entry::LogEntry;
use crate::model::task::EpochMs;
use crate::repo::log_repo::LogStore;
use crate::repo::task_repo::RepoResult;

const JOURNAL_DEFAULT_LIMIT: u32 = 100;
const JOURNAL_LIMIT_MAX: u32 = 500;
const MAX_TAG_CHARS: usize = 32;
const MAX_MESSAGE_CHARS: usize = 512;

/// Journal facade over a `LogStore`.
pub struct JournalService<L: LogStore> {
    store: L,
}

impl<L: LogStore> JournalService<L> {
    pub fn new(store: L) -> Self {
        Self { store }
    }

    /// Appends one entry.
    pub fn record(&self, tag: &str, message: &str, now: EpochMs) -> RepoResult<LogEntry> {
        let tag = sanitize_message(tag.trim(), MAX_TAG_CHARS);
        let message = sanitize_message(message.trim(), MAX_MESSAGE_CHARS);
        self.store.append(&tag, &message, now)
    }

    /// Lists newest entries first. Limit defaults to 100 and clamps to 500.
    pub fn list(&self, limit: Option<u32>) -> RepoResult<Vec<LogEntry>> {
        self.store.list(normalize_journal_limit(limit))
    }

    /// Deletes every entry; returns the removed count.
    pub fn clear(&self) -> RepoResult<usize> {
        self.store.clear()
    }
}

pub fn normalize_journal_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => JOURNAL_DEFAULT_LIMIT,
        Some(value) => value.min(JOURNAL_LIMIT_MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_journal_limit;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(normalize_journal_limit(None), 100);
        assert_eq!(normalize_journal_limit(Some(0)), 100);
        assert_eq!(normalize_journal_limit(Some(20)), 20);
        assert_eq!(normalize_journal_limit(Some(9_999)), 500);
    }
}
