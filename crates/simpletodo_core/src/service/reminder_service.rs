//! Reminder use-case service.
//!
//! # Responsibility
//! - Drive the pure scheduling rules against the local store, the notifier
//!   and the alarm scheduler.
//! - Absorb platform failures (denied notifications, rejected exact alarms)
//!   into typed outcomes.
//! - Return store failures to the caller, which logs them and moves on.
//!
//! # Invariants
//! - Every collaborator is passed in at construction; there is no shared
//!   global store handle.
//! - Rewritten task state is persisted before platform effects run, so a
//!   repeated delivery sees the advanced `retry_count` and is ignored.
//! - Marking a task done always cancels its pending alarm and notification.

use crate::config::{ConfigError, ReminderConfig};
use crate::host::{AlarmError, AlarmScheduler, NotificationAction, Notifier, NotifyError};
use crate::model::task::{EpochMs, NewTask, Recurrence, Task, TaskId, TaskValidationError};
use crate::repo::task_repo::{RepoError, TaskListQuery, TaskStore};
use crate::schedule::rules::{
    next_occurrence, on_mark_done, on_notification_fired, on_reopen, DoneDecision, FireDecision,
    FireSkip, ReminderToken,
};
use crate::schedule::ScheduleError;
use chrono::FixedOffset;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

const REMINDER_ACTIONS: &[NotificationAction] =
    &[NotificationAction::MarkDone, NotificationAction::OpenApp];

pub type ReminderResult<T> = Result<T, ReminderError>;

/// Errors surfaced to reminder service callers.
#[derive(Debug)]
pub enum ReminderError {
    /// Local store failed; callers log and skip.
    Store(RepoError),
    TaskNotFound(TaskId),
    Validation(TaskValidationError),
    Schedule(ScheduleError),
    Config(ConfigError),
}

impl Display for ReminderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "store error: {err}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Schedule(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReminderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Schedule(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::TaskNotFound(_) => None,
        }
    }
}

impl From<RepoError> for ReminderError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::TaskNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}

impl From<ScheduleError> for ReminderError {
    fn from(value: ScheduleError) -> Self {
        Self::Schedule(value)
    }
}

impl From<ConfigError> for ReminderError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Where an alarm ended up after exact/inexact negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmPlacement {
    Exact { at: EpochMs },
    /// Exact timing was refused; the platform may deliver late.
    Inexact { at: EpochMs },
    Failed { at: EpochMs, reason: AlarmError },
}

impl AlarmPlacement {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Exact { .. } => "exact",
            Self::Inexact { .. } => "inexact",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationDelivery {
    Posted,
    /// Not shown; scheduling continues regardless.
    Suppressed(NotifyError),
}

/// A persisted task and the alarm placed for it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub task: Task,
    pub alarm: Option<AlarmPlacement>,
}

/// Editable task fields. Due time and reminder state are not editable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: String,
    pub note: String,
    pub attachments: Vec<String>,
    pub recurrence: Recurrence,
    pub max_retries: u32,
    pub retry_interval_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    /// The task was deleted after the alarm was placed.
    TaskMissing { task_id: TaskId },
    Skipped { task_id: TaskId, reason: FireSkip },
    Notified {
        task: Task,
        delivery: NotificationDelivery,
        retry: Option<AlarmPlacement>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoneOutcome {
    Completed { task: Task },
    Rolled { task: Task, alarm: AlarmPlacement },
    AlreadyDone { task: Task },
}

impl DoneOutcome {
    pub fn task(&self) -> &Task {
        match self {
            Self::Completed { task } | Self::Rolled { task, .. } | Self::AlreadyDone { task } => {
                task
            }
        }
    }
}

/// Tally of alarms re-derived after a restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub exact: usize,
    pub inexact: usize,
    pub failed: usize,
}

impl RestoreReport {
    pub fn total(&self) -> usize {
        self.exact + self.inexact + self.failed
    }

    fn count(&mut self, placement: &AlarmPlacement) {
        match placement {
            AlarmPlacement::Exact { .. } => self.exact += 1,
            AlarmPlacement::Inexact { .. } => self.inexact += 1,
            AlarmPlacement::Failed { .. } => self.failed += 1,
        }
    }
}

/// Reminder orchestration over explicit collaborators.
pub struct ReminderService<S: TaskStore, N: Notifier, A: AlarmScheduler> {
    store: S,
    notifier: N,
    alarms: A,
    config: ReminderConfig,
    offset: FixedOffset,
}

impl<S: TaskStore, N: Notifier, A: AlarmScheduler> ReminderService<S, N, A> {
    /// Builds a service from its collaborators.
    ///
    /// # Errors
    /// - `ReminderError::Config` when `config` fails validation.
    pub fn new(store: S, notifier: N, alarms: A, config: ReminderConfig) -> ReminderResult<Self> {
        config.validate()?;
        let offset = config.offset()?;
        Ok(Self {
            store,
            notifier,
            alarms,
            config,
            offset,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ReminderConfig {
        &self.config
    }

    /// Persists a new task and arms its first reminder.
    pub fn create_task(&self, request: NewTask, now: EpochMs) -> ReminderResult<ScheduledTask> {
        let task = request.into_task(
            self.config.default_max_retries,
            self.config.default_retry_interval_hours,
        );
        self.store.insert(&task)?;
        let alarm = self.arm(&task, now);
        info!(
            "event=task_create module=reminder status=ok task_id={} due_at={} recurrence={} alarm={}",
            task.id,
            task.due_at,
            task.recurrence.as_str(),
            alarm.as_ref().map_or("none", AlarmPlacement::label)
        );
        Ok(ScheduledTask { task, alarm })
    }

    /// Applies descriptive and retry-policy edits.
    ///
    /// Due time and reminder cursor are left alone. When a lowered
    /// `max_retries` clamps `retry_count`, the alarm held by the host carries
    /// a stale token, so a pending reminder is re-armed with the new token.
    pub fn update_task(
        &self,
        id: TaskId,
        edit: TaskEdit,
        now: EpochMs,
    ) -> ReminderResult<ScheduledTask> {
        let mut task = self.load(id)?;
        let previous_retry_count = task.retry_count;
        task.title = edit.title.trim().to_string();
        task.note = edit.note;
        task.attachments = edit.attachments;
        task.recurrence = edit.recurrence;
        task.max_retries = edit.max_retries;
        task.retry_interval_hours = edit.retry_interval_hours;
        task.retry_count = task.retry_count.min(task.max_retries);
        self.store.update(&task)?;

        let alarm = if task.retry_count != previous_retry_count && task.has_pending_reminder() {
            self.arm(&task, now)
        } else {
            None
        };
        info!(
            "event=task_update module=reminder status=ok task_id={} alarm={}",
            id,
            alarm.as_ref().map_or("unchanged", AlarmPlacement::label)
        );
        Ok(ScheduledTask { task, alarm })
    }

    /// Marks a task done, rolling recurring tasks forward.
    pub fn mark_done(&self, id: TaskId, now: EpochMs) -> ReminderResult<DoneOutcome> {
        let task = self.load(id)?;
        let outcome = match on_mark_done(&task, self.offset)? {
            DoneDecision::AlreadyDone => {
                self.cancel_alarm(id);
                DoneOutcome::AlreadyDone { task }
            }
            DoneDecision::Completed { task } => {
                self.store.update(&task)?;
                self.cancel_alarm(id);
                self.cancel_notification(id);
                DoneOutcome::Completed { task }
            }
            DoneDecision::Rolled { task, next_due } => {
                self.store.update(&task)?;
                self.cancel_notification(id);
                let at = next_occurrence(&task, now).unwrap_or(next_due);
                let alarm = self.place_alarm(ReminderToken::for_task(&task), at);
                DoneOutcome::Rolled { task, alarm }
            }
        };
        info!(
            "event=task_done module=reminder status=ok task_id={} due_at={} done={}",
            id,
            outcome.task().due_at,
            outcome.task().done
        );
        Ok(outcome)
    }

    /// Reopens a done task and re-arms its reminder.
    pub fn reopen(&self, id: TaskId, now: EpochMs) -> ReminderResult<ScheduledTask> {
        let task = self.load(id)?;
        let Some(reopened) = on_reopen(&task) else {
            return Ok(ScheduledTask { task, alarm: None });
        };
        self.store.update(&reopened)?;
        let alarm = self.arm(&reopened, now);
        info!("event=task_reopen module=reminder status=ok task_id={id}");
        Ok(ScheduledTask {
            task: reopened,
            alarm,
        })
    }

    /// Deletes a task and clears its platform state.
    pub fn delete_task(&self, id: TaskId) -> ReminderResult<()> {
        self.store.delete(id)?;
        self.cancel_alarm(id);
        self.cancel_notification(id);
        info!("event=task_delete module=reminder status=ok task_id={id}");
        Ok(())
    }

    /// Handles one alarm delivery.
    ///
    /// # Errors
    /// - `ReminderError::Store` when the task cannot be read or written.
    pub fn handle_fired(&self, token: ReminderToken, now: EpochMs) -> ReminderResult<FireOutcome> {
        let Some(task) = self.store.get(token.task_id)? else {
            warn!(
                "event=reminder_fire module=reminder status=skip task_id={} reason=task_missing",
                token.task_id
            );
            self.cancel_alarm(token.task_id);
            return Ok(FireOutcome::TaskMissing {
                task_id: token.task_id,
            });
        };

        match on_notification_fired(&task, token, now) {
            FireDecision::Skip(reason) => {
                debug!(
                    "event=reminder_fire module=reminder status=skip task_id={} reason={:?}",
                    task.id, reason
                );
                Ok(FireOutcome::Skipped {
                    task_id: task.id,
                    reason,
                })
            }
            FireDecision::Notify { task, retry_at } => {
                self.store.update(&task)?;
                let delivery = self.post_notification(&task);
                let retry = retry_at.map(|at| self.place_alarm(ReminderToken::for_task(&task), at));
                match &retry {
                    Some(placement) => info!(
                        "event=reminder_fire module=reminder status=ok task_id={} retry_count={} retry={}",
                        task.id,
                        task.retry_count,
                        placement.label()
                    ),
                    None => info!(
                        "event=reminder_fire module=reminder status=ok task_id={} retry_count={} retry=exhausted",
                        task.id, task.retry_count
                    ),
                }
                Ok(FireOutcome::Notified {
                    task,
                    delivery,
                    retry,
                })
            }
        }
    }

    /// Re-derives every pending alarm from the store, e.g. after reboot.
    pub fn restore_alarms(&self, now: EpochMs) -> ReminderResult<RestoreReport> {
        let pending = self.store.list_due(EpochMs::MAX)?;
        let mut report = RestoreReport::default();
        for task in &pending {
            if let Some(at) = next_occurrence(task, now) {
                let placement = self.place_alarm(ReminderToken::for_task(task), at);
                report.count(&placement);
            }
        }
        info!(
            "event=alarms_restore module=reminder status=ok exact={} inexact={} failed={}",
            report.exact, report.inexact, report.failed
        );
        Ok(report)
    }

    /// Fires every reminder due at `now`; per-task store failures are logged
    /// and skipped.
    pub fn fire_overdue(&self, now: EpochMs) -> ReminderResult<Vec<FireOutcome>> {
        let due = self.store.list_due(now)?;
        let mut outcomes = Vec::with_capacity(due.len());
        for task in &due {
            match self.handle_fired(ReminderToken::for_task(task), now) {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => warn!(
                    "event=reminder_fire module=reminder status=error task_id={} error={}",
                    task.id, err
                ),
            }
        }
        Ok(outcomes)
    }

    pub fn get_task(&self, id: TaskId) -> ReminderResult<Option<Task>> {
        Ok(self.store.get(id)?)
    }

    pub fn list_tasks(&self, query: &TaskListQuery) -> ReminderResult<Vec<Task>> {
        Ok(self.store.list(query)?)
    }

    fn load(&self, id: TaskId) -> ReminderResult<Task> {
        self.store.get(id)?.ok_or(ReminderError::TaskNotFound(id))
    }

    fn arm(&self, task: &Task, now: EpochMs) -> Option<AlarmPlacement> {
        match next_occurrence(task, now) {
            Some(at) => Some(self.place_alarm(ReminderToken::for_task(task), at)),
            None => {
                self.cancel_alarm(task.id);
                None
            }
        }
    }

    fn place_alarm(&self, token: ReminderToken, at: EpochMs) -> AlarmPlacement {
        let exact_err = match self.alarms.schedule_exact(token, at) {
            Ok(()) => return AlarmPlacement::Exact { at },
            Err(err) => err,
        };
        warn!(
            "event=alarm_schedule module=reminder status=fallback task_id={} error={}",
            token.task_id, exact_err
        );
        match self.alarms.schedule_inexact(token, at) {
            Ok(()) => AlarmPlacement::Inexact { at },
            Err(reason) => {
                warn!(
                    "event=alarm_schedule module=reminder status=error task_id={} error={}",
                    token.task_id, reason
                );
                AlarmPlacement::Failed { at, reason }
            }
        }
    }

    fn post_notification(&self, task: &Task) -> NotificationDelivery {
        match self.notifier.post(
            task.id,
            &self.config.notification_title,
            &task.title,
            REMINDER_ACTIONS,
        ) {
            Ok(()) => NotificationDelivery::Posted,
            Err(err) => {
                warn!(
                    "event=notification_post module=reminder status=suppressed task_id={} error={}",
                    task.id, err
                );
                NotificationDelivery::Suppressed(err)
            }
        }
    }

    fn cancel_alarm(&self, id: TaskId) {
        if let Err(err) = self.alarms.cancel(id) {
            warn!("event=alarm_cancel module=reminder status=error task_id={id} error={err}");
        }
    }

    fn cancel_notification(&self, id: TaskId) {
        if let Err(err) = self.notifier.cancel(id) {
            warn!(
                "event=notification_cancel module=reminder status=error task_id={id} error={err}"
            );
        }
    }
}
