use time::PrimitiveDateTime;

use super::{ensure_creator, AttemptSnapshot, ExamCoordinator};
use crate::db::models::{Actor, Answer, Attempt, Exam};
use crate::services::attempt_engine::ManualGrade;
use crate::services::errors::{DomainError, DomainResult};
use crate::services::locks::{attempt_key, publication_key};

impl ExamCoordinator {
    /// Runs `change` on a finished attempt under its lock, as the exam creator.
    /// Refused while the exam's grades are published.
    async fn grade_attempt<R>(
        &self,
        actor: &Actor,
        attempt_id: &str,
        change: impl FnOnce(&mut Attempt, &Exam) -> DomainResult<R>,
    ) -> DomainResult<(Attempt, R)> {
        let _guard = self.locks.lock(attempt_key(attempt_id)).await;
        let mut attempt = self.load_attempt(attempt_id).await?;
        let exam = self.load_exam(&attempt.exam_id).await?;
        ensure_creator(actor, &exam)?;

        let _publication_guard = self.locks.lock(publication_key(&exam.id)).await;
        if self
            .publication_for_exam(&exam.id)
            .await?
            .is_some_and(|publication| publication.is_published())
        {
            return Err(DomainError::invalid_state(
                "grades are published; withdraw them before changing a grade",
            ));
        }

        let outcome = change(&mut attempt, &exam).inspect_err(|err| {
            tracing::debug!(attempt_id, error = %err, "Grading change rejected");
        })?;
        self.store.attempts.save(&mut attempt).await?;
        Ok((attempt, outcome))
    }

    pub(crate) async fn manual_grade(
        &self,
        actor: &Actor,
        attempt_id: &str,
        grade: ManualGrade,
        now: PrimitiveDateTime,
    ) -> DomainResult<Answer> {
        let (attempt, answer) = self
            .grade_attempt(actor, attempt_id, |attempt, exam| {
                attempt.manual_grade(exam, &grade, now).cloned()
            })
            .await?;

        metrics::counter!("manual_grades_total").increment(1);
        tracing::info!(
            attempt_id,
            question_id = %answer.question_id,
            points = answer.points_awarded,
            score = attempt.score,
            "Manual grade recorded"
        );
        Ok(answer)
    }

    /// Applies every grade or none of them.
    pub(crate) async fn grade_all(
        &self,
        actor: &Actor,
        attempt_id: &str,
        grades: Vec<ManualGrade>,
        now: PrimitiveDateTime,
    ) -> DomainResult<Attempt> {
        let count = grades.len();
        let (attempt, ()) = self
            .grade_attempt(actor, attempt_id, |attempt, exam| {
                attempt.grade_all(exam, &grades, now)
            })
            .await?;

        metrics::counter!("manual_grades_total").increment(count as u64);
        tracing::info!(attempt_id, grades = count, score = attempt.score, "Bulk grades recorded");
        Ok(attempt)
    }

    pub(crate) async fn revoke_grade(
        &self,
        actor: &Actor,
        attempt_id: &str,
        question_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Attempt> {
        let (attempt, ()) = self
            .grade_attempt(actor, attempt_id, |attempt, exam| {
                attempt.revoke_grade(exam, question_id, now)
            })
            .await?;

        tracing::info!(attempt_id, question_id, score = attempt.score, "Manual grade revoked");
        Ok(attempt)
    }

    /// Creator-only view of a finished attempt, expiring it first when overdue.
    pub(crate) async fn attempt_for_grading(
        &self,
        actor: &Actor,
        attempt_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<AttemptSnapshot> {
        let attempt = self.load_attempt(attempt_id).await?;
        let exam = self.load_exam(&attempt.exam_id).await?;
        ensure_creator(actor, &exam)?;

        let attempt = if attempt.is_in_progress() {
            self.expire_if_overdue(attempt_id, now).await?
        } else {
            attempt
        };
        if !attempt.status.is_terminal() {
            return Err(DomainError::invalid_state("attempt is still in progress"));
        }

        Ok(AttemptSnapshot { attempt, exam, remaining_seconds: 0 })
    }
}
