//! Role checks and orchestration over the exam, attempt and publication aggregates.
//!
//! Every state change on an attempt runs under that attempt's lock; exam edits run
//! under the exam lock. Aggregates are loaded, mutated in memory, then saved back.

mod attempts;
mod authoring;
mod enrollment;
mod grading;
mod publication;
mod queries;

#[cfg(test)]
mod tests;

pub(crate) use authoring::{window_transition, ExamDetailsUpdate, WindowTransition};
pub(crate) use queries::{AttemptSnapshot, ExamResultRow, PendingGrading, PublishedGrade};

use crate::db::models::{Actor, Attempt, Exam, GradePublication};
use crate::db::types::UserRole;
use crate::repositories::Store;
use crate::services::errors::{DomainError, DomainResult};
use crate::services::locks::KeyedLocks;

pub(crate) struct ExamCoordinator {
    store: Store,
    locks: KeyedLocks,
}

impl ExamCoordinator {
    pub(crate) fn new(store: Store) -> Self {
        Self { store, locks: KeyedLocks::default() }
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    async fn load_exam(&self, exam_id: &str) -> DomainResult<Exam> {
        self.store
            .exams
            .find_by_id(exam_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Exam"))
    }

    async fn load_attempt(&self, attempt_id: &str) -> DomainResult<Attempt> {
        self.store
            .attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Attempt"))
    }

    async fn attempts_for_exam(&self, exam_id: &str) -> DomainResult<Vec<Attempt>> {
        let exam_id = exam_id.to_string();
        let attempts = self
            .store
            .attempts
            .find_all_matching(&move |attempt: &Attempt| attempt.exam_id == exam_id)
            .await?;
        Ok(attempts)
    }

    async fn publication_for_exam(&self, exam_id: &str) -> DomainResult<Option<GradePublication>> {
        let exam_id = exam_id.to_string();
        let mut found = self
            .store
            .publications
            .find_all_matching(&move |publication: &GradePublication| {
                publication.exam_id == exam_id
            })
            .await?;
        Ok(found.pop())
    }
}

fn ensure_creator(actor: &Actor, exam: &Exam) -> DomainResult<()> {
    if exam.created_by != actor.id {
        return Err(DomainError::Forbidden("only the exam creator may do this"));
    }
    Ok(())
}

fn ensure_creator_or_admin(actor: &Actor, exam: &Exam) -> DomainResult<()> {
    if actor.role == UserRole::Admin {
        return Ok(());
    }
    ensure_creator(actor, exam)
}

fn ensure_attempt_owner(actor: &Actor, attempt: &Attempt) -> DomainResult<()> {
    if attempt.student_id != actor.id {
        return Err(DomainError::Forbidden("attempt belongs to another student"));
    }
    Ok(())
}
