use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{Attempt, Exam, GradePublication};
use crate::services::errors::{DomainError, DomainResult};

impl GradePublication {
    pub(crate) fn new(exam_id: &str, now: PrimitiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            exam_id: exam_id.to_string(),
            published: false,
            message: None,
            published_at: None,
            withdrawn_at: None,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    pub(crate) fn is_published(&self) -> bool {
        self.published
    }

    pub(crate) fn publish(
        &mut self,
        now: PrimitiveDateTime,
        message: Option<String>,
        ungraded: usize,
    ) -> DomainResult<()> {
        if self.published {
            return Err(DomainError::invalid_state("grades are already published"));
        }
        if ungraded > 0 {
            return Err(DomainError::UngradedAnswers(ungraded));
        }

        self.published = true;
        self.message = message;
        self.published_at = Some(now);
        self.withdrawn_at = None;
        self.updated_at = now;
        Ok(())
    }

    pub(crate) fn withdraw(&mut self, now: PrimitiveDateTime) -> DomainResult<()> {
        if !self.published {
            return Err(DomainError::invalid_state("grades are not published"));
        }
        self.published = false;
        self.withdrawn_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

/// Unanswered open-response questions count as ungraded too.
pub(crate) fn count_ungraded_open_answers(exam: &Exam, attempts: &[Attempt]) -> usize {
    attempts
        .iter()
        .filter(|attempt| attempt.exam_id == exam.id && attempt.status.is_terminal())
        .map(|attempt| attempt.ungraded_open_questions(exam).len())
        .sum()
}
