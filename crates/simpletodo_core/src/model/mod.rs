//! Domain model for todo tasks and diagnostic journal entries.
//!
//! # Responsibility
//! - Define canonical data structures used by scheduling and storage.
//! - Keep recurrence as a single tagged variant; legacy shapes stop at import.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Journal entries are append-only.

pub mod log_entry;
pub mod task;
