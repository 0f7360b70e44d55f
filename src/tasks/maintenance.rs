use anyhow::{Context, Result};
use time::PrimitiveDateTime;

use crate::db::models::{Attempt, Exam};
use crate::db::types::{AttemptStatus, ExamStatus};
use crate::services::coordinator::{window_transition, ExamCoordinator, WindowTransition};
use crate::services::work_timing::deadline_reached;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SweepReport {
    pub(crate) expired: usize,
    pub(crate) failed: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowSyncReport {
    pub(crate) opened: usize,
    pub(crate) closed: usize,
    pub(crate) failed: usize,
}

/// Ids of in-progress attempts whose deadline has been reached at `now`.
pub(crate) fn select_overdue(attempts: &[Attempt], now: PrimitiveDateTime) -> Vec<String> {
    attempts
        .iter()
        .filter(|attempt| attempt.status == AttemptStatus::InProgress)
        .filter(|attempt| deadline_reached(attempt.expires_at, now))
        .map(|attempt| attempt.id.clone())
        .collect()
}

pub(crate) fn select_exam_transitions(
    exams: &[Exam],
    now: PrimitiveDateTime,
) -> Vec<(String, WindowTransition)> {
    exams
        .iter()
        .map(|exam| (exam.id.clone(), window_transition(exam, now)))
        .filter(|(_, transition)| *transition != WindowTransition::Unchanged)
        .collect()
}

/// Each attempt is re-checked under its own lock; one failing record never stops the pass.
pub(crate) async fn expire_overdue_attempts(
    coordinator: &ExamCoordinator,
    now: PrimitiveDateTime,
) -> Result<SweepReport> {
    let in_progress = coordinator
        .store()
        .attempts
        .find_all_matching(&|attempt: &Attempt| attempt.status == AttemptStatus::InProgress)
        .await
        .context("Failed to fetch in-progress attempts")?;

    let mut report = SweepReport::default();
    for attempt_id in select_overdue(&in_progress, now) {
        match coordinator.expire_if_overdue(&attempt_id, now).await {
            Ok(attempt) if attempt.status == AttemptStatus::Expired => report.expired += 1,
            Ok(_) => {}
            Err(err) => {
                report.failed += 1;
                tracing::error!(attempt_id, error = %err, "Failed to expire overdue attempt");
            }
        }
    }

    if report.expired > 0 || report.failed > 0 {
        tracing::info!(
            expired_attempts = report.expired,
            failed = report.failed,
            "Expired overdue attempts"
        );
    }
    Ok(report)
}

pub(crate) async fn sync_exam_windows(
    coordinator: &ExamCoordinator,
    now: PrimitiveDateTime,
) -> Result<WindowSyncReport> {
    let candidates = coordinator
        .store()
        .exams
        .find_all_matching(&|exam: &Exam| {
            matches!(exam.status, ExamStatus::Ready | ExamStatus::Open)
        })
        .await
        .context("Failed to fetch schedulable exams")?;

    let mut report = WindowSyncReport::default();
    for (exam_id, _) in select_exam_transitions(&candidates, now) {
        match coordinator.sync_exam_window(&exam_id, now).await {
            Ok(WindowTransition::Opened) => report.opened += 1,
            Ok(WindowTransition::Closed) => report.closed += 1,
            Ok(WindowTransition::Unchanged) => {}
            Err(err) => {
                report.failed += 1;
                tracing::error!(exam_id, error = %err, "Failed to sync exam window");
            }
        }
    }

    if report.opened > 0 || report.closed > 0 || report.failed > 0 {
        tracing::info!(
            opened = report.opened,
            closed = report.closed,
            failed = report.failed,
            "Synced exam windows"
        );
    }
    Ok(report)
}
