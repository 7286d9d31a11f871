//! Platform ports for notifications and alarms.
//!
//! # Responsibility
//! - Define the narrow notifier and alarm interfaces the reminder service
//!   drives.
//! - Provide a recording host that turns calls into an effect list for
//!   hosts which execute platform work themselves (FFI) and for tests.
//!
//! # Invariants
//! - Ports report failures as typed errors; they never panic.
//! - `RecordingHost` honors its capabilities exactly like a platform would:
//!   denied notifications and rejected exact alarms return errors.

use crate::model::task::{EpochMs, TaskId};
use crate::schedule::rules::ReminderToken;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Action button attached to a reminder notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    /// Marks the task done without opening the app.
    MarkDone,
    /// Opens the app; bound to the notification body tap.
    OpenApp,
}

impl NotificationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarkDone => "mark_done",
            Self::OpenApp => "open_app",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The user has not granted notification permission.
    PermissionDenied,
    Unavailable(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "notification permission denied"),
            Self::Unavailable(reason) => write!(f, "notifier unavailable: {reason}"),
        }
    }
}

impl Error for NotifyError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmError {
    /// Exact alarms are not permitted; callers fall back to inexact timing.
    ExactNotPermitted,
    Rejected(String),
}

impl Display for AlarmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactNotPermitted => write!(f, "exact alarms not permitted"),
            Self::Rejected(reason) => write!(f, "alarm rejected: {reason}"),
        }
    }
}

impl Error for AlarmError {}

/// Notification port. Notification IDs are task IDs.
pub trait Notifier {
    fn post(
        &self,
        id: TaskId,
        title: &str,
        body: &str,
        actions: &[NotificationAction],
    ) -> Result<(), NotifyError>;
    fn cancel(&self, id: TaskId) -> Result<(), NotifyError>;
}

/// Alarm/timer port. One pending alarm per task ID; scheduling replaces it.
pub trait AlarmScheduler {
    fn schedule_exact(&self, token: ReminderToken, at: EpochMs) -> Result<(), AlarmError>;
    fn schedule_inexact(&self, token: ReminderToken, at: EpochMs) -> Result<(), AlarmError>;
    fn cancel(&self, id: TaskId) -> Result<(), AlarmError>;
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn post(
        &self,
        id: TaskId,
        title: &str,
        body: &str,
        actions: &[NotificationAction],
    ) -> Result<(), NotifyError> {
        (**self).post(id, title, body, actions)
    }

    fn cancel(&self, id: TaskId) -> Result<(), NotifyError> {
        (**self).cancel(id)
    }
}

impl<T: AlarmScheduler + ?Sized> AlarmScheduler for &T {
    fn schedule_exact(&self, token: ReminderToken, at: EpochMs) -> Result<(), AlarmError> {
        (**self).schedule_exact(token, at)
    }

    fn schedule_inexact(&self, token: ReminderToken, at: EpochMs) -> Result<(), AlarmError> {
        (**self).schedule_inexact(token, at)
    }

    fn cancel(&self, id: TaskId) -> Result<(), AlarmError> {
        (**self).cancel(id)
    }
}

/// Platform side effect requested by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEffect {
    PostNotification {
        id: TaskId,
        title: String,
        body: String,
        actions: Vec<NotificationAction>,
    },
    CancelNotification {
        id: TaskId,
    },
    ScheduleAlarm {
        token: ReminderToken,
        at: EpochMs,
        exact: bool,
    },
    CancelAlarm {
        id: TaskId,
    },
}

/// What the host platform currently allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCapabilities {
    pub notifications_allowed: bool,
    pub exact_alarms_allowed: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            notifications_allowed: true,
            exact_alarms_allowed: true,
        }
    }
}

/// In-memory notifier + alarm scheduler that records accepted effects.
#[derive(Debug, Default)]
pub struct RecordingHost {
    capabilities: HostCapabilities,
    effects: RefCell<Vec<HostEffect>>,
}

impl RecordingHost {
    pub fn new(capabilities: HostCapabilities) -> Self {
        Self {
            capabilities,
            effects: RefCell::new(Vec::new()),
        }
    }

    /// Returns a snapshot of recorded effects in call order.
    pub fn effects(&self) -> Vec<HostEffect> {
        self.effects.borrow().clone()
    }

    /// Drains recorded effects.
    pub fn take_effects(&self) -> Vec<HostEffect> {
        std::mem::take(&mut *self.effects.borrow_mut())
    }

    /// Returns the alarm still pending for `id` after replaying all effects.
    pub fn pending_alarm(&self, id: TaskId) -> Option<(ReminderToken, EpochMs)> {
        self.effects
            .borrow()
            .iter()
            .fold(None, |pending, effect| match effect {
                HostEffect::ScheduleAlarm { token, at, .. } if token.task_id == id => {
                    Some((*token, *at))
                }
                HostEffect::CancelAlarm { id: cancelled } if *cancelled == id => None,
                _ => pending,
            })
    }

    fn record(&self, effect: HostEffect) {
        self.effects.borrow_mut().push(effect);
    }
}

impl Notifier for RecordingHost {
    fn post(
        &self,
        id: TaskId,
        title: &str,
        body: &str,
        actions: &[NotificationAction],
    ) -> Result<(), NotifyError> {
        if !self.capabilities.notifications_allowed {
            return Err(NotifyError::PermissionDenied);
        }
        self.record(HostEffect::PostNotification {
            id,
            title: title.to_string(),
            body: body.to_string(),
            actions: actions.to_vec(),
        });
        Ok(())
    }

    fn cancel(&self, id: TaskId) -> Result<(), NotifyError> {
        self.record(HostEffect::CancelNotification { id });
        Ok(())
    }
}

impl AlarmScheduler for RecordingHost {
    fn schedule_exact(&self, token: ReminderToken, at: EpochMs) -> Result<(), AlarmError> {
        if !self.capabilities.exact_alarms_allowed {
            return Err(AlarmError::ExactNotPermitted);
        }
        self.record(HostEffect::ScheduleAlarm {
            token,
            at,
            exact: true,
        });
        Ok(())
    }

    fn schedule_inexact(&self, token: ReminderToken, at: EpochMs) -> Result<(), AlarmError> {
        self.record(HostEffect::ScheduleAlarm {
            token,
            at,
            exact: false,
        });
        Ok(())
    }

    fn cancel(&self, id: TaskId) -> Result<(), AlarmError> {
        self.record(HostEffect::CancelAlarm { id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AlarmError, AlarmScheduler, HostCapabilities, Notifier, NotifyError, RecordingHost};
    use crate::schedule::rules::ReminderToken;
    use uuid::Uuid;

    #[test]
    fn denied_permission_records_nothing() {
        let host = RecordingHost::new(HostCapabilities {
            notifications_allowed: false,
            exact_alarms_allowed: true,
        });
        let err = host.post(Uuid::new_v4(), "t", "b", &[]).unwrap_err();
        assert_eq!(err, NotifyError::PermissionDenied);
        assert!(host.effects().is_empty());
    }

    #[test]
    fn pending_alarm_replays_schedule_and_cancel() {
        let host = RecordingHost::default();
        let id = Uuid::new_v4();
        let token = ReminderToken {
            task_id: id,
            retry_count: 0,
        };

        host.schedule_exact(token, 10).unwrap();
        assert_eq!(host.pending_alarm(id), Some((token, 10)));

        AlarmScheduler::cancel(&host, id).unwrap();
        assert_eq!(host.pending_alarm(id), None);

        let denied = RecordingHost::new(HostCapabilities {
            notifications_allowed: true,
            exact_alarms_allowed: false,
        });
        assert_eq!(
            denied.schedule_exact(token, 10),
            Err(AlarmError::ExactNotPermitted)
        );
    }
}
