//! Reminder scheduling rules.
//!
//! # Responsibility
//! - Decide when the next reminder fires and how retries advance.
//! - Roll recurring tasks forward on completion using calendar arithmetic.
//!
//! # Invariants
//! - Everything here is pure: no storage, no platform calls, no clock reads.
//! - Decisions return a rewritten task copy; callers persist it.

use crate::model::task::EpochMs;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod recurrence;
pub mod rules;

/// Scheduling arithmetic failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The timestamp (or its successor) is outside the representable calendar.
    TimestampOutOfRange(EpochMs),
    /// The configured UTC offset is outside `±18h`.
    InvalidUtcOffset(i32),
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimestampOutOfRange(value) => {
                write!(f, "timestamp {value} is out of calendar range")
            }
            Self::InvalidUtcOffset(minutes) => {
                write!(f, "utc offset {minutes} minutes is out of range")
            }
        }
    }
}

impl Error for ScheduleError {}
