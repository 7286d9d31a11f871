//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Hand platform side effects back to the host as an explicit list.
//! - Record one journal line per mutating call.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures are reported in response envelopes, never as panics.
//! - Each call opens its own connection and builds its own service.

use log::warn;
use rusqlite::Connection;
use simpletodo_core::db::open_db;
use simpletodo_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AlarmPlacement, CoreConfig, DoneOutcome, EpochMs, FireOutcome, HostCapabilities, HostEffect,
    JournalService, LogEntry, LoggingConfig, NewTask, Recurrence, RecordingHost, ReminderError,
    ReminderResult, ReminderService, ReminderToken, SqliteLogStore, SqliteTaskStore, Task,
    TaskEdit, TaskId, TaskListQuery, TaskStore,
};
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const DB_FILE_NAME: &str = "simpletodo.sqlite3";
const DB_PATH_ENV: &str = "SIMPLETODO_DB_PATH";
const JOURNAL_TAG: &str = "ffi";

static SETTINGS: OnceLock<StorageSettings> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
struct StorageSettings {
    db_path: PathBuf,
    config: CoreConfig,
}

type FfiService<'a> = ReminderService<SqliteTaskStore<'a>, &'a RecordingHost, &'a RecordingHost>;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(&LoggingConfig::new(level, log_dir)) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Pins the database path and core config for this process.
///
/// Input semantics:
/// - `db_path`: database file; blank falls back to `SIMPLETODO_DB_PATH`
///   and then to the temp directory.
/// - `config_json`: `CoreConfig` document; blank means defaults. A
///   `logging` section starts file logging as well.
///
/// # FFI contract
/// - Must run before any task call to take effect; repeating it with the
///   same arguments is a no-op.
/// - Opens the database once so migrations and the legacy import run here.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_storage(db_path: String, config_json: String) -> String {
    let config = if config_json.trim().is_empty() {
        CoreConfig::default()
    } else {
        match CoreConfig::from_json_str(&config_json) {
            Ok(config) => config,
            Err(err) => return format!("configure_storage failed: {err}"),
        }
    };

    if let Some(logging) = &config.logging {
        if let Err(err) = init_logging_inner(logging) {
            return format!("configure_storage failed: {err}");
        }
    }

    let trimmed = db_path.trim();
    let requested = StorageSettings {
        db_path: if trimmed.is_empty() {
            default_db_path()
        } else {
            PathBuf::from(trimmed)
        },
        config,
    };
    let active = SETTINGS.get_or_init(|| requested.clone());
    if *active != requested {
        return format!(
            "configure_storage failed: storage already configured at `{}`",
            active.db_path.display()
        );
    }

    match open_db(&active.db_path) {
        Ok(_) => String::new(),
        Err(err) => format!("configure_storage failed: {err}"),
    }
}

/// Platform permissions reported by the host on each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilitiesDto {
    pub notifications_allowed: bool,
    pub exact_alarms_allowed: bool,
}

impl From<HostCapabilitiesDto> for HostCapabilities {
    fn from(value: HostCapabilitiesDto) -> Self {
        Self {
            notifications_allowed: value.notifications_allowed,
            exact_alarms_allowed: value.exact_alarms_allowed,
        }
    }
}

/// Platform side effect the host must run, in list order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEffectDto {
    PostNotification {
        task_id: String,
        title: String,
        body: String,
        /// Action ids, e.g. `mark_done`.
        actions: Vec<String>,
    },
    CancelNotification {
        task_id: String,
    },
    /// The host hands `task_id + retry_count` back to `reminder_fired`.
    ScheduleAlarm {
        task_id: String,
        at_epoch_ms: i64,
        exact: bool,
        retry_count: u32,
    },
    CancelAlarm {
        task_id: String,
    },
}

/// Task fields editable from the host.
///
/// `None` retry fields mean "config default" on create and "keep current"
/// on update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub due_epoch_ms: i64,
    /// `none|weekly|monthly`; blank means `none`.
    pub recurrence: String,
    pub note: String,
    pub attachments: Vec<String>,
    pub max_retries: Option<u32>,
    pub retry_interval_hours: Option<u32>,
}

/// Task projection for list screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub task_id: String,
    pub title: String,
    pub due_epoch_ms: i64,
    pub recurrence: String,
    pub note: String,
    pub attachments: Vec<String>,
    pub done: bool,
    pub retry_count: u32,
    pub max_retries: u32,
    pub retry_interval_hours: u32,
    pub next_reminder_epoch_ms: Option<i64>,
}

/// Action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Affected task ID, when the call targets one task.
    pub task_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
    /// Side effects to run on the platform.
    pub effects: Vec<HostEffectDto>,
}

impl TaskActionResponse {
    fn success(
        message: impl Into<String>,
        task_id: Option<TaskId>,
        effects: Vec<HostEffect>,
    ) -> Self {
        Self {
            ok: true,
            task_id: task_id.map(|id| id.to_string()),
            message: message.into(),
            effects: effects.into_iter().map(to_effect_dto).collect(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            task_id: None,
            message: message.into(),
            effects: Vec::new(),
        }
    }
}

/// List response envelope for task screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub ok: bool,
    pub items: Vec<TaskItem>,
    pub message: String,
}

/// Journal row for the host's log screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogItem {
    pub id: i64,
    pub timestamp_epoch_ms: i64,
    pub tag: String,
    pub message: String,
}

/// List response envelope for the log screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogListResponse {
    pub ok: bool,
    pub items: Vec<LogItem>,
    pub message: String,
}

/// Creates a task and arms its first reminder.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns the created task ID and the alarm effect on success.
#[flutter_rust_bridge::frb(sync)]
pub fn task_create(
    draft: TaskDraft,
    now_epoch_ms: i64,
    capabilities: HostCapabilitiesDto,
) -> TaskActionResponse {
    let recurrence = match parse_recurrence(&draft.recurrence) {
        Ok(recurrence) => recurrence,
        Err(err) => return TaskActionResponse::failure(format!("task_create failed: {err}")),
    };
    let request = NewTask {
        title: draft.title,
        due_at: draft.due_epoch_ms,
        recurrence,
        note: draft.note,
        attachments: draft.attachments,
        max_retries: draft.max_retries,
        retry_interval_hours: draft.retry_interval_hours,
    };

    match with_reminder_service("task_create", capabilities, now_epoch_ms, |service| {
        service.create_task(request, now_epoch_ms)
    }) {
        Ok((scheduled, effects)) => {
            let message = match &scheduled.alarm {
                Some(AlarmPlacement::Failed { .. }) => {
                    "Task created; reminder could not be scheduled."
                }
                _ => "Task created.",
            };
            TaskActionResponse::success(message, Some(scheduled.task.id), effects)
        }
        Err(err) => TaskActionResponse::failure(err),
    }
}

/// Edits title, note, attachments, recurrence and retry policy.
///
/// The due time is kept. A pending reminder is re-armed when a lowered
/// retry limit clamps the retry count.
#[flutter_rust_bridge::frb(sync)]
pub fn task_update(
    task_id: String,
    draft: TaskDraft,
    now_epoch_ms: i64,
    capabilities: HostCapabilitiesDto,
) -> TaskActionResponse {
    let id = match parse_task_id(&task_id) {
        Ok(id) => id,
        Err(err) => return TaskActionResponse::failure(format!("task_update failed: {err}")),
    };
    let recurrence = match parse_recurrence(&draft.recurrence) {
        Ok(recurrence) => recurrence,
        Err(err) => return TaskActionResponse::failure(format!("task_update failed: {err}")),
    };
    match with_reminder_service("task_update", capabilities, now_epoch_ms, |service| {
        let current = service
            .get_task(id)?
            .ok_or(ReminderError::TaskNotFound(id))?;
        let edit = TaskEdit {
            title: draft.title,
            note: draft.note,
            attachments: draft.attachments,
            recurrence,
            max_retries: draft.max_retries.unwrap_or(current.max_retries),
            retry_interval_hours: draft
                .retry_interval_hours
                .unwrap_or(current.retry_interval_hours),
        };
        service.update_task(id, edit, now_epoch_ms)
    }) {
        Ok((scheduled, effects)) => {
            TaskActionResponse::success("Task updated.", Some(scheduled.task.id), effects)
        }
        Err(err) => TaskActionResponse::failure(err),
    }
}

/// Marks a task done; recurring tasks roll to their next due time.
#[flutter_rust_bridge::frb(sync)]
pub fn task_mark_done(
    task_id: String,
    now_epoch_ms: i64,
    capabilities: HostCapabilitiesDto,
) -> TaskActionResponse {
    let id = match parse_task_id(&task_id) {
        Ok(id) => id,
        Err(err) => return TaskActionResponse::failure(format!("task_mark_done failed: {err}")),
    };

    match with_reminder_service("task_mark_done", capabilities, now_epoch_ms, |service| {
        service.mark_done(id, now_epoch_ms)
    }) {
        Ok((outcome, effects)) => {
            let message = match outcome {
                DoneOutcome::Completed { .. } => "Task completed.",
                DoneOutcome::Rolled { .. } => "Task rescheduled to next occurrence.",
                DoneOutcome::AlreadyDone { .. } => "Task was already done.",
            };
            TaskActionResponse::success(message, Some(id), effects)
        }
        Err(err) => TaskActionResponse::failure(err),
    }
}

/// Reopens a done task and re-arms its reminder.
#[flutter_rust_bridge::frb(sync)]
pub fn task_reopen(
    task_id: String,
    now_epoch_ms: i64,
    capabilities: HostCapabilitiesDto,
) -> TaskActionResponse {
    let id = match parse_task_id(&task_id) {
        Ok(id) => id,
        Err(err) => return TaskActionResponse::failure(format!("task_reopen failed: {err}")),
    };

    match with_reminder_service("task_reopen", capabilities, now_epoch_ms, |service| {
        service.reopen(id, now_epoch_ms)
    }) {
        Ok((scheduled, effects)) => {
            TaskActionResponse::success("Task reopened.", Some(scheduled.task.id), effects)
        }
        Err(err) => TaskActionResponse::failure(err),
    }
}

/// Deletes a task and cancels its alarm and notification.
#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(task_id: String, now_epoch_ms: i64) -> TaskActionResponse {
    let id = match parse_task_id(&task_id) {
        Ok(id) => id,
        Err(err) => return TaskActionResponse::failure(format!("task_delete failed: {err}")),
    };

    match with_reminder_service("task_delete", host_defaults(), now_epoch_ms, |service| {
        service.delete_task(id)
    }) {
        Ok(((), effects)) => TaskActionResponse::success("Task deleted.", Some(id), effects),
        Err(err) => TaskActionResponse::failure(err),
    }
}

/// Lists tasks ordered by due time.
///
/// # FFI contract
/// - Read-only; writes no journal line.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_list(include_done: bool) -> TaskListResponse {
    let query = TaskListQuery {
        include_done,
        ..TaskListQuery::default()
    };
    let result = open_connection("tasks_list").and_then(|conn| {
        let store = SqliteTaskStore::try_new(&conn)
            .map_err(|err| format!("tasks_list store init failed: {err}"))?;
        store
            .list(&query)
            .map_err(|err| format!("tasks_list failed: {err}"))
    });

    match result {
        Ok(tasks) => TaskListResponse {
            ok: true,
            message: format!("Loaded {} task(s).", tasks.len()),
            items: tasks.into_iter().map(to_task_item).collect(),
        },
        Err(message) => TaskListResponse {
            ok: false,
            items: Vec::new(),
            message,
        },
    }
}

/// Handles one alarm delivery for `task_id + retry_count`.
///
/// # FFI contract
/// - Duplicate deliveries of the same alarm are answered with an empty
///   effect list.
#[flutter_rust_bridge::frb(sync)]
pub fn reminder_fired(
    task_id: String,
    retry_count: u32,
    now_epoch_ms: i64,
    capabilities: HostCapabilitiesDto,
) -> TaskActionResponse {
    let id = match parse_task_id(&task_id) {
        Ok(id) => id,
        Err(err) => return TaskActionResponse::failure(format!("reminder_fired failed: {err}")),
    };
    let token = ReminderToken {
        task_id: id,
        retry_count,
    };

    match with_reminder_service("reminder_fired", capabilities, now_epoch_ms, |service| {
        service.handle_fired(token, now_epoch_ms)
    }) {
        Ok((outcome, effects)) => {
            TaskActionResponse::success(fire_message(&outcome), Some(id), effects)
        }
        Err(err) => TaskActionResponse::failure(err),
    }
}

/// Re-places every pending alarm, e.g. after device reboot.
#[flutter_rust_bridge::frb(sync)]
pub fn reminders_restore(
    now_epoch_ms: i64,
    capabilities: HostCapabilitiesDto,
) -> TaskActionResponse {
    match with_reminder_service("reminders_restore", capabilities, now_epoch_ms, |service| {
        service.restore_alarms(now_epoch_ms)
    }) {
        Ok((report, effects)) => TaskActionResponse::success(
            format!(
                "Restored {} reminder(s): exact={} inexact={} failed={}.",
                report.total(),
                report.exact,
                report.inexact,
                report.failed
            ),
            None,
            effects,
        ),
        Err(err) => TaskActionResponse::failure(err),
    }
}

/// Fires every reminder due at `now_epoch_ms`.
///
/// For hosts that poll on resume instead of holding a background alarm.
#[flutter_rust_bridge::frb(sync)]
pub fn reminders_fire_overdue(
    now_epoch_ms: i64,
    capabilities: HostCapabilitiesDto,
) -> TaskActionResponse {
    match with_reminder_service(
        "reminders_fire_overdue",
        capabilities,
        now_epoch_ms,
        |service| service.fire_overdue(now_epoch_ms),
    ) {
        Ok((outcomes, effects)) => {
            let notified = outcomes
                .iter()
                .filter(|outcome| matches!(outcome, FireOutcome::Notified { .. }))
                .count();
            TaskActionResponse::success(
                format!("Fired {notified} reminder(s)."),
                None,
                effects,
            )
        }
        Err(err) => TaskActionResponse::failure(err),
    }
}

/// Lists journal entries newest first.
///
/// Limit defaults to 100 and clamps to 500.
#[flutter_rust_bridge::frb(sync)]
pub fn logs_list(limit: Option<u32>) -> LogListResponse {
    let result = open_connection("logs_list").and_then(|conn| {
        let journal = SqliteLogStore::try_new(&conn)
            .map(JournalService::new)
            .map_err(|err| format!("logs_list store init failed: {err}"))?;
        journal
            .list(limit)
            .map_err(|err| format!("logs_list failed: {err}"))
    });

    match result {
        Ok(entries) => LogListResponse {
            ok: true,
            message: format!("Loaded {} log(s).", entries.len()),
            items: entries.into_iter().map(to_log_item).collect(),
        },
        Err(message) => LogListResponse {
            ok: false,
            items: Vec::new(),
            message,
        },
    }
}

/// Deletes every journal entry.
#[flutter_rust_bridge::frb(sync)]
pub fn logs_clear() -> TaskActionResponse {
    let result = open_connection("logs_clear").and_then(|conn| {
        let journal = SqliteLogStore::try_new(&conn)
            .map(JournalService::new)
            .map_err(|err| format!("logs_clear store init failed: {err}"))?;
        journal
            .clear()
            .map_err(|err| format!("logs_clear failed: {err}"))
    });

    match result {
        Ok(removed) => {
            TaskActionResponse::success(format!("Cleared {removed} log(s)."), None, Vec::new())
        }
        Err(message) => TaskActionResponse::failure(message),
    }
}

fn with_reminder_service<T>(
    call: &'static str,
    capabilities: HostCapabilitiesDto,
    now: EpochMs,
    f: impl FnOnce(&FfiService<'_>) -> ReminderResult<T>,
) -> Result<(T, Vec<HostEffect>), String> {
    let settings = resolve_settings();
    let conn = open_connection(call)?;
    let store = SqliteTaskStore::try_new(&conn)
        .map_err(|err| format!("{call} store init failed: {err}"))?;
    let host = RecordingHost::new(capabilities.into());
    let service = ReminderService::new(store, &host, &host, settings.config.reminder.clone())
        .map_err(|err| format!("{call} service init failed: {err}"))?;

    let result = f(&service);
    let effects = host.take_effects();
    let journal_line = match &result {
        Ok(_) => format!("{call} status=ok effects={}", effects.len()),
        Err(err) => format!("{call} status=error error={err}"),
    };
    record_journal(&conn, &journal_line, now);

    result
        .map(|value| (value, effects))
        .map_err(|err| format!("{call} failed: {err}"))
}

fn record_journal(conn: &Connection, message: &str, now: EpochMs) {
    let recorded = SqliteLogStore::try_new(conn)
        .map(JournalService::new)
        .and_then(|journal| journal.record(JOURNAL_TAG, message, now));
    if let Err(err) = recorded {
        warn!("event=journal_record module=ffi status=error error={err}");
    }
}

fn open_connection(call: &str) -> Result<Connection, String> {
    open_db(&resolve_settings().db_path).map_err(|err| format!("{call} DB open failed: {err}"))
}

fn resolve_settings() -> &'static StorageSettings {
    SETTINGS.get_or_init(|| StorageSettings {
        db_path: default_db_path(),
        config: CoreConfig::default(),
    })
}

fn default_db_path() -> PathBuf {
    if let Ok(raw) = std::env::var(DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(DB_FILE_NAME)
}

fn host_defaults() -> HostCapabilitiesDto {
    HostCapabilitiesDto {
        notifications_allowed: true,
        exact_alarms_allowed: true,
    }
}

fn parse_task_id(raw: &str) -> Result<TaskId, String> {
    Uuid::parse_str(raw.trim()).map_err(|_| format!("invalid task_id `{}`", raw.trim()))
}

fn parse_recurrence(raw: &str) -> Result<Recurrence, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Ok(Recurrence::None);
    }
    Recurrence::parse(&normalized).ok_or_else(|| format!("unsupported recurrence `{normalized}`"))
}

fn fire_message(outcome: &FireOutcome) -> &'static str {
    match outcome {
        FireOutcome::TaskMissing { .. } => "Task no longer exists.",
        FireOutcome::Skipped { .. } => "Reminder skipped.",
        FireOutcome::Notified { retry: Some(_), .. } => "Reminder posted; retry scheduled.",
        FireOutcome::Notified { retry: None, .. } => "Reminder posted.",
    }
}

fn to_effect_dto(effect: HostEffect) -> HostEffectDto {
    match effect {
        HostEffect::PostNotification {
            id,
            title,
            body,
            actions,
        } => HostEffectDto::PostNotification {
            task_id: id.to_string(),
            title,
            body,
            actions: actions
                .into_iter()
                .map(|action| action.as_str().to_string())
                .collect(),
        },
        HostEffect::CancelNotification { id } => HostEffectDto::CancelNotification {
            task_id: id.to_string(),
        },
        HostEffect::ScheduleAlarm { token, at, exact } => HostEffectDto::ScheduleAlarm {
            task_id: token.task_id.to_string(),
            at_epoch_ms: at,
            exact,
            retry_count: token.retry_count,
        },
        HostEffect::CancelAlarm { id } => HostEffectDto::CancelAlarm {
            task_id: id.to_string(),
        },
    }
}

fn to_task_item(task: Task) -> TaskItem {
    TaskItem {
        task_id: task.id.to_string(),
        title: task.title,
        due_epoch_ms: task.due_at,
        recurrence: task.recurrence.as_str().to_string(),
        note: task.note,
        attachments: task.attachments,
        done: task.done,
        retry_count: task.retry_count,
        max_retries: task.max_retries,
        retry_interval_hours: task.retry_interval_hours,
        next_reminder_epoch_ms: task.next_reminder_at,
    }
}

fn to_log_item(entry: LogEntry) -> LogItem {
    LogItem {
        id: entry.id,
        timestamp_epoch_ms: entry.timestamp,
        tag: entry.tag,
        message: entry.message,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        configure_storage, core_version, init_logging, logs_list, ping, reminder_fired,
        task_create, task_delete, task_mark_done, task_update, tasks_list, HostCapabilitiesDto,
        HostEffectDto, StorageSettings, TaskDraft, DB_FILE_NAME, SETTINGS,
    };
    use simpletodo_core::CoreConfig;
    use std::sync::OnceLock;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tempfile::TempDir;

    static TEST_DB_DIR: OnceLock<TempDir> = OnceLock::new();

    /// Pins storage to a database under a fresh temp dir for this test run.
    fn use_isolated_db() {
        let dir = TEST_DB_DIR.get_or_init(|| tempfile::tempdir().expect("create temp dir"));
        let active = SETTINGS.get_or_init(|| StorageSettings {
            db_path: dir.path().join(DB_FILE_NAME),
            config: CoreConfig::default(),
        });
        assert!(active.db_path.starts_with(dir.path()));
    }

    const HOUR_MS: i64 = 60 * 60 * 1000;

    fn allow_all() -> HostCapabilitiesDto {
        HostCapabilitiesDto {
            notifications_allowed: true,
            exact_alarms_allowed: true,
        }
    }

    fn draft(title: &str, due: i64) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            due_epoch_ms: due,
            recurrence: String::new(),
            note: String::new(),
            attachments: Vec::new(),
            max_retries: None,
            retry_interval_hours: None,
        }
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn configure_storage_rejects_invalid_config() {
        let error = configure_storage(
            String::new(),
            r#"{"reminder":{"default_max_retries":42}}"#.to_string(),
        );
        assert!(error.contains("default_max_retries"));
    }

    #[test]
    fn create_fire_and_complete_flow_returns_effects() {
        use_isolated_db();
        let now = unique_now();
        let due = now + HOUR_MS;
        let created = task_create(draft("flow", due), now, allow_all());
        assert!(created.ok, "{}", created.message);
        let task_id = created.task_id.clone().expect("create should return task_id");
        assert_eq!(
            created.effects,
            vec![HostEffectDto::ScheduleAlarm {
                task_id: task_id.clone(),
                at_epoch_ms: due,
                exact: true,
                retry_count: 0,
            }]
        );

        let fired = reminder_fired(task_id.clone(), 0, due, allow_all());
        assert!(fired.ok, "{}", fired.message);
        assert!(matches!(
            &fired.effects[0],
            HostEffectDto::PostNotification { actions, .. }
                if actions.contains(&"mark_done".to_string())
        ));
        assert!(fired.effects.contains(&HostEffectDto::ScheduleAlarm {
            task_id: task_id.clone(),
            at_epoch_ms: due + HOUR_MS,
            exact: true,
            retry_count: 1,
        }));

        let duplicate = reminder_fired(task_id.clone(), 0, due, allow_all());
        assert!(duplicate.ok, "{}", duplicate.message);
        assert!(duplicate.effects.is_empty());

        let done = task_mark_done(task_id.clone(), due + 10, allow_all());
        assert!(done.ok, "{}", done.message);
        assert!(done.effects.contains(&HostEffectDto::CancelAlarm {
            task_id: task_id.clone(),
        }));

        let open = tasks_list(false);
        assert!(open.ok, "{}", open.message);
        assert!(open.items.iter().all(|item| item.task_id != task_id));

        let all = tasks_list(true);
        let item = all
            .items
            .iter()
            .find(|item| item.task_id == task_id)
            .expect("done task should be listed");
        assert!(item.done);
        assert_eq!(item.next_reminder_epoch_ms, None);
    }

    #[test]
    fn denied_exact_alarm_falls_back_to_inexact() {
        use_isolated_db();
        let now = unique_now();
        let created = task_create(
            draft("inexact", now + HOUR_MS),
            now,
            HostCapabilitiesDto {
                notifications_allowed: true,
                exact_alarms_allowed: false,
            },
        );
        assert!(created.ok, "{}", created.message);
        assert!(matches!(
            created.effects.as_slice(),
            [HostEffectDto::ScheduleAlarm { exact: false, .. }]
        ));
    }

    #[test]
    fn update_keeps_retry_policy_when_omitted() {
        use_isolated_db();
        let now = unique_now();
        let mut request = draft("before", now + HOUR_MS);
        request.max_retries = Some(5);
        let created = task_create(request, now, allow_all());
        let task_id = created.task_id.expect("create should return task_id");

        let mut edit = draft("after", now + HOUR_MS);
        edit.recurrence = "Weekly".to_string();
        let updated = task_update(task_id.clone(), edit, now, allow_all());
        assert!(updated.ok, "{}", updated.message);
        assert!(updated.effects.is_empty());

        let item = tasks_list(true)
            .items
            .into_iter()
            .find(|item| item.task_id == task_id)
            .expect("updated task should be listed");
        assert_eq!(item.title, "after");
        assert_eq!(item.recurrence, "weekly");
        assert_eq!(item.max_retries, 5);
    }

    #[test]
    fn bad_inputs_return_failure_envelopes() {
        use_isolated_db();
        let response = task_mark_done("not-a-uuid".to_string(), 0, allow_all());
        assert!(!response.ok);
        assert!(response.message.contains("invalid task_id"));

        let mut request = draft("bad recurrence", 0);
        request.recurrence = "daily".to_string();
        let response = task_create(request, 0, allow_all());
        assert!(!response.ok);
        assert!(response.message.contains("unsupported recurrence"));

        let response = task_delete(uuid::Uuid::new_v4().to_string(), 0);
        assert!(!response.ok);
        assert!(response.message.contains("task not found"));
    }

    #[test]
    fn mutating_calls_write_journal_lines() {
        use_isolated_db();
        let now = unique_now();
        let created = task_create(draft("journal", now), now, allow_all());
        assert!(created.ok, "{}", created.message);

        let logs = logs_list(Some(500));
        assert!(logs.ok, "{}", logs.message);
        assert!(logs
            .items
            .iter()
            .any(|item| item.timestamp_epoch_ms == now && item.message.starts_with("task_create")));
    }

    fn unique_now() -> i64 {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_millis();
        i64::try_from(millis).expect("timestamp should fit i64")
    }
}
