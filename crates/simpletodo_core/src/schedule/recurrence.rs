//! Calendar arithmetic for recurring tasks.
//!
//! Weekly and monthly steps are wall-clock steps in the host's UTC offset:
//! a task due Monday 09:00 stays on Monday 09:00 local time.

use super::ScheduleError;
use crate::model::task::{EpochMs, Recurrence};
use chrono::{DateTime, Days, FixedOffset, Months, TimeZone};

const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Builds the fixed offset used for calendar steps.
///
/// # Errors
/// - `ScheduleError::InvalidUtcOffset` outside `±18h`.
pub fn utc_offset(minutes: i32) -> Result<FixedOffset, ScheduleError> {
    if minutes.abs() > MAX_OFFSET_MINUTES {
        return Err(ScheduleError::InvalidUtcOffset(minutes));
    }
    FixedOffset::east_opt(minutes * 60).ok_or(ScheduleError::InvalidUtcOffset(minutes))
}

/// Returns the due time following `due_at` for a recurring task.
///
/// Returns `Ok(None)` for non-recurring tasks. Monthly steps keep the
/// day-of-month and clip it to the target month length (Jan 31 -> Feb 28/29).
pub fn next_due_after(
    due_at: EpochMs,
    recurrence: Recurrence,
    offset: FixedOffset,
) -> Result<Option<EpochMs>, ScheduleError> {
    let local = to_local(due_at, offset)?;
    let next = match recurrence {
        Recurrence::None => return Ok(None),
        Recurrence::Weekly => local.checked_add_days(Days::new(7)),
        Recurrence::Monthly => local.checked_add_months(Months::new(1)),
    };
    next.map(|value| Some(value.timestamp_millis()))
        .ok_or(ScheduleError::TimestampOutOfRange(due_at))
}

fn to_local(value: EpochMs, offset: FixedOffset) -> Result<DateTime<FixedOffset>, ScheduleError> {
    offset
        .timestamp_millis_opt(value)
        .single()
        .ok_or(ScheduleError::TimestampOutOfRange(value))
}
