//! Reminder firing, completion and retry rules.
//!
//! # Invariants
//! - A done task never yields a notification.
//! - `retry_count` advances by at most one per accepted firing and never
//!   past `max_retries`.
//! - A firing whose token disagrees with the stored `retry_count` is a
//!   duplicate and changes nothing.
//! - `due_at` only moves on completion of a recurring task, and forward.

use super::recurrence::next_due_after;
use super::ScheduleError;
use crate::model::task::{EpochMs, Task, TaskId};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// Alarms delivered this much earlier than the cursor still count as due.
pub const EARLY_FIRE_TOLERANCE_MS: i64 = 60 * 1000;

/// Identity of one scheduled reminder delivery.
///
/// Captured when an alarm is placed and handed back when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderToken {
    pub task_id: TaskId,
    /// Stored `retry_count` at scheduling time.
    pub retry_count: u32,
}

impl ReminderToken {
    pub fn for_task(task: &Task) -> Self {
        Self {
            task_id: task.id,
            retry_count: task.retry_count,
        }
    }
}

/// Why a firing was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireSkip {
    AlreadyDone,
    NoPendingReminder,
    StaleToken { token_retry_count: u32, stored_retry_count: u32 },
    NotYetDue { next_reminder_at: EpochMs },
}

/// Result of applying a reminder firing to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireDecision {
    /// Nothing to persist and nothing to show.
    Skip(FireSkip),
    /// Show the notification once, persist `task`, and place a retry alarm
    /// at `retry_at` when present.
    Notify { task: Task, retry_at: Option<EpochMs> },
}

impl FireDecision {
    pub fn should_notify(&self) -> bool {
        matches!(self, Self::Notify { .. })
    }

    pub fn retry_at(&self) -> Option<EpochMs> {
        match self {
            Self::Notify { retry_at, .. } => *retry_at,
            Self::Skip(_) => None,
        }
    }
}

/// Result of marking a task done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoneDecision {
    /// Non-recurring task is now done; any pending alarm must be cancelled.
    Completed { task: Task },
    /// Recurring task rolled forward; reschedule at `next_due`.
    Rolled { task: Task, next_due: EpochMs },
    /// Task was already done; nothing changes.
    AlreadyDone,
}

/// Returns when the next reminder for `task` should fire.
///
/// Overdue reminders fire immediately (`now`). Returns `None` when the task
/// is done or has no pending reminder.
pub fn next_occurrence(task: &Task, now: EpochMs) -> Option<EpochMs> {
    if task.done {
        return None;
    }
    task.next_reminder_at.map(|at| at.max(now))
}

/// Applies one reminder firing.
pub fn on_notification_fired(task: &Task, token: ReminderToken, now: EpochMs) -> FireDecision {
    if task.done {
        return FireDecision::Skip(FireSkip::AlreadyDone);
    }
    let Some(cursor) = task.next_reminder_at else {
        return FireDecision::Skip(FireSkip::NoPendingReminder);
    };
    if token.task_id != task.id || token.retry_count != task.retry_count {
        return FireDecision::Skip(FireSkip::StaleToken {
            token_retry_count: token.retry_count,
            stored_retry_count: task.retry_count,
        });
    }
    if now.saturating_add(EARLY_FIRE_TOLERANCE_MS) < cursor {
        return FireDecision::Skip(FireSkip::NotYetDue {
            next_reminder_at: cursor,
        });
    }

    let mut updated = task.clone();
    let retry_at = if updated.can_retry() {
        let at = now.saturating_add(updated.retry_interval_ms());
        updated.retry_count += 1;
        Some(at)
    } else {
        None
    };
    updated.next_reminder_at = retry_at;

    FireDecision::Notify {
        task: updated,
        retry_at,
    }
}

/// Applies "mark done".
///
/// # Errors
/// - `ScheduleError::TimestampOutOfRange` when the rolled due time is not
///   representable.
pub fn on_mark_done(task: &Task, offset: FixedOffset) -> Result<DoneDecision, ScheduleError> {
    if task.done {
        return Ok(DoneDecision::AlreadyDone);
    }

    let mut updated = task.clone();
    match next_due_after(task.due_at, task.recurrence, offset)? {
        None => {
            updated.done = true;
            updated.next_reminder_at = None;
            Ok(DoneDecision::Completed { task: updated })
        }
        Some(next_due) => {
            updated.due_at = next_due;
            updated.retry_count = 0;
            updated.done = false;
            updated.next_reminder_at = Some(next_due);
            Ok(DoneDecision::Rolled {
                task: updated,
                next_due,
            })
        }
    }
}

/// Reopens a done task.
///
/// The reminder cursor returns to `due_at`; an already-past due time fires
/// on the next scheduling pass. Returns `None` when the task is not done.
pub fn on_reopen(task: &Task) -> Option<Task> {
    if !task.done {
        return None;
    }
    let mut updated = task.clone();
    updated.done = false;
    updated.retry_count = 0;
    updated.next_reminder_at = Some(updated.due_at);
    Some(updated)
}
