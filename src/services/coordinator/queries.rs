use time::PrimitiveDateTime;

use super::{ensure_attempt_owner, ensure_creator, ensure_creator_or_admin, ExamCoordinator};
use crate::db::models::{Actor, Attempt, Exam, GradePublication};
use crate::db::types::{AttemptStatus, UserRole};
use crate::services::errors::{DomainError, DomainResult};

#[derive(Debug, Clone)]
pub(crate) struct AttemptSnapshot {
    pub(crate) attempt: Attempt,
    pub(crate) exam: Exam,
    pub(crate) remaining_seconds: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct PublishedGrade {
    pub(crate) exam: Exam,
    pub(crate) attempt: Attempt,
    pub(crate) publication: GradePublication,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExamResultRow {
    pub(crate) attempt_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) score: f64,
    pub(crate) total_points: f64,
    pub(crate) fully_graded: bool,
    pub(crate) finished_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingGrading {
    pub(crate) attempt_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) finished_at: Option<PrimitiveDateTime>,
    pub(crate) ungraded_question_ids: Vec<String>,
}

impl ExamCoordinator {
    /// Creators see their own exams, students the exams they are actively enrolled in.
    pub(crate) async fn list_exams(&self, actor: &Actor) -> DomainResult<Vec<Exam>> {
        let actor_id = actor.id.clone();
        let role = actor.role;
        let mut exams = self
            .store
            .exams
            .find_all_matching(&move |exam: &Exam| match role {
                UserRole::Admin => true,
                UserRole::Teacher => exam.created_by == actor_id,
                UserRole::Student => exam.has_active_enrollment(&actor_id),
            })
            .await?;
        exams.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(exams)
    }

    pub(crate) async fn get_exam(&self, actor: &Actor, exam_id: &str) -> DomainResult<Exam> {
        let exam = self.load_exam(exam_id).await?;
        if actor.role == UserRole::Student {
            if !exam.has_active_enrollment(&actor.id) {
                return Err(DomainError::Forbidden("not enrolled in this exam"));
            }
        } else {
            ensure_creator_or_admin(actor, &exam)?;
        }
        Ok(exam)
    }

    pub(crate) async fn remaining_time(
        &self,
        actor: &Actor,
        attempt_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<i64> {
        let attempt = self.load_attempt(attempt_id).await?;
        ensure_attempt_owner(actor, &attempt)?;
        Ok(attempt.remaining_seconds(now))
    }

    /// Students get their own attempts; the creator gets every attempt.
    pub(crate) async fn list_attempts(
        &self,
        actor: &Actor,
        exam_id: &str,
    ) -> DomainResult<Vec<Attempt>> {
        let exam = self.load_exam(exam_id).await?;
        let mut attempts = self.attempts_for_exam(exam_id).await?;

        if actor.role == UserRole::Student {
            attempts.retain(|attempt| attempt.student_id == actor.id);
        } else {
            ensure_creator(actor, &exam)?;
        }

        attempts.sort_by(|left, right| {
            left.student_id
                .cmp(&right.student_id)
                .then(left.attempt_number.cmp(&right.attempt_number))
        });
        Ok(attempts)
    }

    /// Oldest submission first.
    pub(crate) async fn pending_grading(
        &self,
        actor: &Actor,
        exam_id: &str,
    ) -> DomainResult<Vec<PendingGrading>> {
        let exam = self.load_exam(exam_id).await?;
        ensure_creator(actor, &exam)?;

        let mut pending: Vec<PendingGrading> = self
            .attempts_for_exam(exam_id)
            .await?
            .into_iter()
            .filter(|attempt| attempt.status.is_terminal())
            .filter_map(|attempt| {
                let ungraded: Vec<String> = attempt
                    .ungraded_open_questions(&exam)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                (!ungraded.is_empty()).then(|| PendingGrading {
                    attempt_id: attempt.id.clone(),
                    student_id: attempt.student_id.clone(),
                    attempt_number: attempt.attempt_number,
                    finished_at: attempt.finished_at,
                    ungraded_question_ids: ungraded,
                })
            })
            .collect();

        pending.sort_by(|left, right| {
            left.finished_at
                .cmp(&right.finished_at)
                .then_with(|| left.attempt_id.cmp(&right.attempt_id))
        });
        Ok(pending)
    }

    pub(crate) async fn exam_results(
        &self,
        actor: &Actor,
        exam_id: &str,
    ) -> DomainResult<Vec<ExamResultRow>> {
        let exam = self.load_exam(exam_id).await?;
        ensure_creator(actor, &exam)?;
        let total_points = exam.total_points();

        let mut rows: Vec<ExamResultRow> = self
            .attempts_for_exam(exam_id)
            .await?
            .into_iter()
            .filter(|attempt| attempt.status.is_terminal())
            .map(|attempt| ExamResultRow {
                attempt_id: attempt.id,
                student_id: attempt.student_id,
                attempt_number: attempt.attempt_number,
                status: attempt.status,
                score: attempt.score,
                total_points,
                fully_graded: attempt.fully_graded,
                finished_at: attempt.finished_at,
            })
            .collect();

        rows.sort_by(|left, right| {
            left.student_id
                .cmp(&right.student_id)
                .then(left.attempt_number.cmp(&right.attempt_number))
        });
        Ok(rows)
    }

    /// Hidden until grades are published and the latest finished attempt is fully graded.
    pub(crate) async fn student_note_detail(
        &self,
        actor: &Actor,
        exam_id: &str,
        student_id: &str,
    ) -> DomainResult<PublishedGrade> {
        if actor.id != student_id {
            return Err(DomainError::Forbidden("grades are visible only to their student"));
        }

        let exam = self.load_exam(exam_id).await?;
        let publication = match self.publication_for_exam(exam_id).await? {
            Some(publication) if publication.is_published() => publication,
            _ => return Err(DomainError::invalid_state("grades are not published yet")),
        };

        let attempt = self
            .attempts_for_exam(exam_id)
            .await?
            .into_iter()
            .filter(|attempt| attempt.student_id == student_id && attempt.status.is_terminal())
            .max_by_key(|attempt| attempt.attempt_number)
            .ok_or_else(|| DomainError::not_found("Graded attempt"))?;

        // Attempts finished after publication may still be awaiting a manual grade.
        if !attempt.ungraded_open_questions(&exam).is_empty() {
            return Err(DomainError::invalid_state("this attempt is still being graded"));
        }

        Ok(PublishedGrade { exam, attempt, publication })
    }
}
