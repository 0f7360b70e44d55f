use time::PrimitiveDateTime;

use super::{ensure_attempt_owner, AttemptSnapshot, ExamCoordinator};
use crate::db::models::{Actor, Answer, Attempt};
use crate::db::types::{AttemptStatus, UserRole};
use crate::services::errors::{DomainError, DomainResult};
use crate::services::locks::{attempt_key, start_key};

impl ExamCoordinator {
    /// Resumes the in-progress attempt when there is one.
    pub(crate) async fn start_attempt(
        &self,
        actor: &Actor,
        exam_id: &str,
        student_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Attempt> {
        if actor.role != UserRole::Student || actor.id != student_id {
            return Err(DomainError::Forbidden("only the enrolled student can start an attempt"));
        }

        let _guard = self.locks.lock(start_key(exam_id, student_id)).await;
        let exam = self.load_exam(exam_id).await?;

        if !exam.has_active_enrollment(student_id) {
            return Err(DomainError::Forbidden("not enrolled in this exam"));
        }
        if !exam.is_available(now) {
            tracing::debug!(exam_id, student_id, status = exam.status.as_str(), "Exam not available");
            return Err(DomainError::invalid_state("exam is not available for attempts right now"));
        }

        let owner = student_id.to_string();
        let mut previous = self
            .store
            .attempts
            .find_all_matching(&move |attempt: &Attempt| {
                attempt.exam_id == exam_id && attempt.student_id == owner
            })
            .await?;

        if let Some(position) = previous.iter().position(Attempt::is_in_progress) {
            let active = previous.swap_remove(position);
            if now < active.expires_at {
                tracing::debug!(exam_id, student_id, attempt_id = %active.id, "Resuming attempt");
                return Ok(active);
            }
            let expired = self.expire_locked(&active.id, now, "lazy").await?;
            previous.push(expired);
        }

        let finished = previous.len() as i32;
        if finished >= exam.max_attempts {
            return Err(DomainError::invalid_state(format!(
                "attempt limit reached ({} of {})",
                finished, exam.max_attempts
            )));
        }

        let mut attempt = Attempt::new(&exam, student_id, finished + 1, now);
        self.store.attempts.save(&mut attempt).await?;

        metrics::counter!("attempts_started_total").increment(1);
        tracing::info!(
            exam_id,
            student_id,
            attempt_id = %attempt.id,
            attempt_number = attempt.attempt_number,
            expires_at = %attempt.expires_at,
            "Attempt started"
        );
        Ok(attempt)
    }

    pub(crate) async fn save_answer(
        &self,
        actor: &Actor,
        attempt_id: &str,
        question_id: &str,
        content: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Answer> {
        let _guard = self.locks.lock(attempt_key(attempt_id)).await;
        let mut attempt = self.load_attempt(attempt_id).await?;
        ensure_attempt_owner(actor, &attempt)?;
        let exam = self.load_exam(&attempt.exam_id).await?;

        let status_before = attempt.status;
        let result = attempt.save_answer(&exam, question_id, content, now).cloned();

        match result {
            Ok(answer) => {
                self.store.attempts.save(&mut attempt).await?;
                metrics::counter!("answers_saved_total").increment(1);
                Ok(answer)
            }
            Err(err) => {
                if attempt.status != status_before {
                    self.store.attempts.save(&mut attempt).await?;
                    record_expiry(&attempt, "lazy");
                }
                tracing::debug!(attempt_id, question_id, error = %err, "Answer save rejected");
                Err(err)
            }
        }
    }

    pub(crate) async fn submit_attempt(
        &self,
        actor: &Actor,
        attempt_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Attempt> {
        let _guard = self.locks.lock(attempt_key(attempt_id)).await;
        let mut attempt = self.load_attempt(attempt_id).await?;
        ensure_attempt_owner(actor, &attempt)?;
        let exam = self.load_exam(&attempt.exam_id).await?;

        let status = attempt.submit(&exam, now).inspect_err(|err| {
            tracing::debug!(attempt_id, error = %err, "Submit rejected");
        })?;
        self.store.attempts.save(&mut attempt).await?;

        match status {
            AttemptStatus::Expired => record_expiry(&attempt, "submit"),
            _ => {
                metrics::counter!("attempts_submitted_total").increment(1);
                tracing::info!(
                    attempt_id,
                    exam_id = %attempt.exam_id,
                    student_id = %attempt.student_id,
                    score = attempt.score,
                    "Attempt submitted"
                );
            }
        }
        Ok(attempt)
    }

    /// Resume view. An overdue attempt is expired and persisted before it is returned.
    pub(crate) async fn get_attempt(
        &self,
        actor: &Actor,
        attempt_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<AttemptSnapshot> {
        let _guard = self.locks.lock(attempt_key(attempt_id)).await;
        let mut attempt = self.load_attempt(attempt_id).await?;
        ensure_attempt_owner(actor, &attempt)?;
        let exam = self.load_exam(&attempt.exam_id).await?;

        if attempt.expire_if_overdue(&exam, now) {
            self.store.attempts.save(&mut attempt).await?;
            record_expiry(&attempt, "lazy");
        }

        let remaining_seconds = attempt.remaining_seconds(now);
        Ok(AttemptSnapshot { attempt, exam, remaining_seconds })
    }

    /// Background sweep entry point. No-op unless the attempt is in progress and overdue.
    pub(crate) async fn expire_if_overdue(
        &self,
        attempt_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Attempt> {
        self.expire_locked(attempt_id, now, "sweep").await
    }

    async fn expire_locked(
        &self,
        attempt_id: &str,
        now: PrimitiveDateTime,
        source: &'static str,
    ) -> DomainResult<Attempt> {
        let _guard = self.locks.lock(attempt_key(attempt_id)).await;
        let mut attempt = self.load_attempt(attempt_id).await?;
        let exam = self.load_exam(&attempt.exam_id).await?;

        if attempt.expire_if_overdue(&exam, now) {
            self.store.attempts.save(&mut attempt).await?;
            record_expiry(&attempt, source);
        }
        Ok(attempt)
    }
}

fn record_expiry(attempt: &Attempt, source: &'static str) {
    metrics::counter!("attempts_expired_total", "source" => source).increment(1);
    tracing::info!(
        attempt_id = %attempt.id,
        exam_id = %attempt.exam_id,
        student_id = %attempt.student_id,
        score = attempt.score,
        source,
        "Attempt expired"
    );
}
