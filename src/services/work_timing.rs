use time::{Duration, PrimitiveDateTime};

use crate::db::types::AttemptStatus;
use crate::services::errors::{DomainError, DomainResult};

pub(crate) fn validate_schedule(
    start_time: PrimitiveDateTime,
    end_time: PrimitiveDateTime,
    duration_minutes: i32,
) -> DomainResult<()> {
    if end_time < start_time {
        return Err(DomainError::invalid_argument("end_time must not be before start_time"));
    }
    if duration_minutes <= 0 {
        return Err(DomainError::invalid_argument("duration_minutes must be positive"));
    }

    let window = window_minutes(start_time, end_time);
    if i64::from(duration_minutes) > window {
        return Err(DomainError::invalid_argument(format!(
            "duration_minutes ({duration_minutes}) exceeds the exam window ({window} minutes)"
        )));
    }

    Ok(())
}

pub(crate) fn window_minutes(start_time: PrimitiveDateTime, end_time: PrimitiveDateTime) -> i64 {
    (end_time - start_time).whole_minutes()
}

/// Personal budget capped by the exam's closing time: a late start never buys extra time.
pub(crate) fn compute_deadline(
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
    window_end: Option<PrimitiveDateTime>,
) -> PrimitiveDateTime {
    let duration_deadline = started_at + Duration::minutes(i64::from(duration_minutes.max(0)));

    match window_end {
        Some(end) if end < duration_deadline => end,
        _ => duration_deadline,
    }
}

pub(crate) fn remaining_seconds(
    status: AttemptStatus,
    deadline: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> i64 {
    if status.is_terminal() || now >= deadline {
        return 0;
    }

    (deadline - now).whole_seconds().max(0)
}

/// Strictly after the deadline.
pub(crate) fn is_past_deadline(deadline: PrimitiveDateTime, now: PrimitiveDateTime) -> bool {
    now > deadline
}

/// Writes are only accepted strictly before the deadline.
pub(crate) fn deadline_reached(deadline: PrimitiveDateTime, now: PrimitiveDateTime) -> bool {
    now >= deadline
}
