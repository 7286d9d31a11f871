//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical todo record owned by the local store.
//! - Collapse recurrence into one tagged variant at the model boundary.
//! - Validate structural invariants before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `retry_count <= max_retries`.
//! - `due_at` only moves forward, and only when a recurring task completes.
//! - A done task has no pending reminder (`next_reminder_at == None`).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a task.
///
/// Also used as the host-side alarm/notification key.
pub type TaskId = Uuid;

/// Unix epoch milliseconds.
pub type EpochMs = i64;

/// Upper bound for per-task retry count.
pub const MAX_RETRIES_LIMIT: u32 = 5;

/// Retry count used when a creation request omits it.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Retry interval used when a creation request omits it.
pub const DEFAULT_RETRY_INTERVAL_HOURS: u32 = 1;

const MS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Whether and how a task repeats after completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    /// One-off task; completion marks it done.
    #[default]
    None,
    /// Due time rolls forward by seven calendar days on completion.
    Weekly,
    /// Due time rolls forward by one calendar month on completion.
    Monthly,
}

impl Recurrence {
    /// Stable storage label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Parses a storage label produced by [`Recurrence::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    /// Resolves legacy dual-field records into one recurrence value.
    ///
    /// A non-zero `repeat_mode` wins (`1 = weekly`, `2 = monthly`). When it
    /// is absent, zero or unknown, the boolean `is_monthly` flag decides.
    pub fn from_legacy(is_monthly: bool, repeat_mode: Option<i64>) -> Self {
        match repeat_mode {
            Some(1) => Self::Weekly,
            Some(2) => Self::Monthly,
            _ if is_monthly => Self::Monthly,
            _ => Self::None,
        }
    }

    pub fn is_recurring(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Validation errors for task invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
    RetryCountExceedsMax { retry_count: u32, max_retries: u32 },
    MaxRetriesTooLarge { max_retries: u32, limit: u32 },
    ZeroRetryInterval,
    DoneWithPendingReminder,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title cannot be blank"),
            Self::RetryCountExceedsMax {
                retry_count,
                max_retries,
            } => write!(
                f,
                "retry_count {retry_count} exceeds max_retries {max_retries}"
            ),
            Self::MaxRetriesTooLarge { max_retries, limit } => {
                write!(f, "max_retries {max_retries} exceeds limit {limit}")
            }
            Self::ZeroRetryInterval => write!(f, "retry_interval_hours must be at least 1"),
            Self::DoneWithPendingReminder => {
                write!(f, "done task cannot have a pending reminder")
            }
        }
    }
}

impl Error for TaskValidationError {}

/// Canonical todo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// Due time in epoch milliseconds.
    pub due_at: EpochMs,
    pub recurrence: Recurrence,
    /// Free-text remarks.
    pub note: String,
    /// Host file references for attached images.
    pub attachments: Vec<String>,
    pub done: bool,
    /// Reminders already fired beyond the first one.
    pub retry_count: u32,
    pub max_retries: u32,
    pub retry_interval_hours: u32,
    /// Reminder cursor. `None` when no automatic reminder is pending.
    pub next_reminder_at: Option<EpochMs>,
}

impl Task {
    /// Creates an open task with a generated ID and default retry policy.
    ///
    /// The first reminder is pending at `due_at`.
    pub fn new(title: impl Into<String>, due_at: EpochMs) -> Self {
        Self::with_id(Uuid::new_v4(), title, due_at)
    }

    /// Creates an open task with a caller-provided stable ID.
    ///
    /// Used by legacy import where identity is assigned during migration.
    pub fn with_id(id: TaskId, title: impl Into<String>, due_at: EpochMs) -> Self {
        Self {
            id,
            title: title.into(),
            due_at,
            recurrence: Recurrence::None,
            note: String::new(),
            attachments: Vec::new(),
            done: false,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval_hours: DEFAULT_RETRY_INTERVAL_HOURS,
            next_reminder_at: Some(due_at),
        }
    }

    /// Validates structural invariants.
    ///
    /// # Errors
    /// - Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(TaskValidationError::MaxRetriesTooLarge {
                max_retries: self.max_retries,
                limit: MAX_RETRIES_LIMIT,
            });
        }
        if self.retry_count > self.max_retries {
            return Err(TaskValidationError::RetryCountExceedsMax {
                retry_count: self.retry_count,
                max_retries: self.max_retries,
            });
        }
        if self.retry_interval_hours == 0 {
            return Err(TaskValidationError::ZeroRetryInterval);
        }
        if self.done && self.next_reminder_at.is_some() {
            return Err(TaskValidationError::DoneWithPendingReminder);
        }
        Ok(())
    }

    /// Returns whether an automatic reminder is still expected.
    pub fn has_pending_reminder(&self) -> bool {
        !self.done && self.next_reminder_at.is_some()
    }

    /// Returns whether another retry may be scheduled after the current one.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Retry interval in milliseconds.
    pub fn retry_interval_ms(&self) -> i64 {
        i64::from(self.retry_interval_hours) * MS_PER_HOUR
    }
}

/// Creation request for a new task.
///
/// `None` retry fields fall back to configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub due_at: EpochMs,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub retry_interval_hours: Option<u32>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, due_at: EpochMs) -> Self {
        Self {
            title: title.into(),
            due_at,
            ..Self::default()
        }
    }

    /// Builds a task with a fresh ID, filling omitted retry fields.
    pub fn into_task(self, default_max_retries: u32, default_interval_hours: u32) -> Task {
        let mut task = Task::new(self.title.trim(), self.due_at);
        task.recurrence = self.recurrence;
        task.note = self.note;
        task.attachments = self
            .attachments
            .into_iter()
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .collect();
        task.max_retries = self.max_retries.unwrap_or(default_max_retries);
        task.retry_interval_hours = self.retry_interval_hours.unwrap_or(default_interval_hours);
        task
    }
}

#[cfg(test)]
mod tests {
    use super::{NewTask, Recurrence, Task, TaskValidationError, MAX_RETRIES_LIMIT};

    #[test]
    fn new_task_has_pending_reminder_at_due() {
        let task = Task::new("water plants", 1_000);
        assert_eq!(task.next_reminder_at, Some(1_000));
        assert!(task.has_pending_reminder());
        assert!(task.validate().is_ok());
    }

    #[test]
    fn legacy_repeat_mode_wins_over_monthly_flag() {
        assert_eq!(Recurrence::from_legacy(true, Some(1)), Recurrence::Weekly);
        assert_eq!(Recurrence::from_legacy(false, Some(2)), Recurrence::Monthly);
        assert_eq!(Recurrence::from_legacy(true, Some(0)), Recurrence::Monthly);
        assert_eq!(Recurrence::from_legacy(true, None), Recurrence::Monthly);
        assert_eq!(Recurrence::from_legacy(false, Some(7)), Recurrence::None);
        assert_eq!(Recurrence::from_legacy(false, None), Recurrence::None);
    }

    #[test]
    fn validate_rejects_broken_invariants() {
        let mut task = Task::new("  ", 0);
        assert_eq!(task.validate(), Err(TaskValidationError::EmptyTitle));

        task.title = "pay rent".to_string();
        task.retry_count = 4;
        task.max_retries = 3;
        assert!(matches!(
            task.validate(),
            Err(TaskValidationError::RetryCountExceedsMax { .. })
        ));

        task.retry_count = 0;
        task.max_retries = MAX_RETRIES_LIMIT + 1;
        assert!(matches!(
            task.validate(),
            Err(TaskValidationError::MaxRetriesTooLarge { .. })
        ));

        task.max_retries = 3;
        task.retry_interval_hours = 0;
        assert_eq!(task.validate(), Err(TaskValidationError::ZeroRetryInterval));

        task.retry_interval_hours = 2;
        task.done = true;
        assert_eq!(
            task.validate(),
            Err(TaskValidationError::DoneWithPendingReminder)
        );
    }

    #[test]
    fn new_task_request_fills_defaults_and_drops_blank_attachments() {
        let mut request = NewTask::new(" dentist ", 5_000);
        request.attachments = vec!["/data/img_1.jpg".to_string(), "  ".to_string()];
        request.retry_interval_hours = Some(4);

        let task = request.into_task(2, 1);
        assert_eq!(task.title, "dentist");
        assert_eq!(task.max_retries, 2);
        assert_eq!(task.retry_interval_hours, 4);
        assert_eq!(task.attachments, vec!["/data/img_1.jpg".to_string()]);
        assert_eq!(task.retry_interval_ms(), 4 * 60 * 60 * 1000);
    }
}
