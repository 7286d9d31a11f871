//! Core domain logic for SimpleTodo.
//! This crate is the single source of truth for task and reminder invariants.

pub mod config;
pub mod db;
pub mod host;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;

pub use config::{ConfigError, CoreConfig, ReminderConfig};
pub use host::{
    AlarmError, AlarmScheduler, HostCapabilities, HostEffect, NotificationAction, Notifier,
    NotifyError, RecordingHost,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::log_entry::LogEntry;
pub use model::task::{EpochMs, NewTask, Recurrence, Task, TaskId, TaskValidationError};
pub use repo::log_repo::{LogStore, SqliteLogStore};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskStore, TaskListQuery, TaskStore};
pub use schedule::rules::{FireSkip, ReminderToken};
pub use schedule::ScheduleError;
pub use service::journal_service::JournalService;
pub use service::reminder_service::{
    AlarmPlacement, DoneOutcome, FireOutcome, NotificationDelivery, ReminderError,
    ReminderResult, ReminderService, RestoreReport, ScheduledTask, TaskEdit,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
