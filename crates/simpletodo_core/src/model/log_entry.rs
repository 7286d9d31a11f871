//! Diagnostic journal record.
//!
//! Journal rows are observability data shown by the host's log screen.
//! They carry no domain state and are never read back by scheduling code.

use super::task::EpochMs;
use serde::{Deserialize, Serialize};

/// Append-only diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Store-assigned row id; increases with insertion order.
    pub id: i64,
    /// Epoch milliseconds when the entry was recorded.
    pub timestamp: EpochMs,
    /// Short source label, e.g. `ReminderService`.
    pub tag: String,
    pub message: String,
}
