use time::PrimitiveDateTime;

use super::{ensure_creator, ExamCoordinator};
use crate::db::models::{Actor, Exam, Question};
use crate::db::types::{ChoiceType, ExamStatus, McqPolicy, UserRole};
use crate::services::errors::{DomainError, DomainResult};
use crate::services::locks::exam_key;
use crate::services::question_bank::{build_choice_question, build_open_question, OptionDraft};

#[derive(Debug, Clone, Default)]
pub(crate) struct ExamDetailsUpdate {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<Option<String>>,
    pub(crate) max_attempts: Option<i32>,
}

/// Outcome of one automatic window check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowTransition {
    Opened,
    Closed,
    Unchanged,
}

impl ExamCoordinator {
    pub(crate) async fn create_exam(
        &self,
        actor: &Actor,
        title: &str,
        description: Option<String>,
        now: PrimitiveDateTime,
    ) -> DomainResult<Exam> {
        if !matches!(actor.role, UserRole::Teacher | UserRole::Admin) {
            return Err(DomainError::Forbidden("only teachers can create exams"));
        }

        let mut exam = Exam::new(title, description, &actor.id, now)?;
        self.store.exams.save(&mut exam).await?;

        tracing::info!(exam_id = %exam.id, created_by = %actor.id, "Exam created");
        Ok(exam)
    }

    /// Loads the exam under its lock, checks ownership, applies `change`, saves.
    async fn mutate_exam<R>(
        &self,
        actor: &Actor,
        exam_id: &str,
        change: impl FnOnce(&mut Exam) -> DomainResult<R>,
    ) -> DomainResult<(Exam, R)> {
        let _guard = self.locks.lock(exam_key(exam_id)).await;
        let mut exam = self.load_exam(exam_id).await?;
        ensure_creator(actor, &exam)?;

        let outcome = match change(&mut exam) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::debug!(exam_id, error = %err, "Exam change rejected");
                return Err(err);
            }
        };

        self.store.exams.save(&mut exam).await?;
        Ok((exam, outcome))
    }

    pub(crate) async fn update_exam(
        &self,
        actor: &Actor,
        exam_id: &str,
        update: ExamDetailsUpdate,
        now: PrimitiveDateTime,
    ) -> DomainResult<Exam> {
        let (exam, ()) = self
            .mutate_exam(actor, exam_id, |exam| {
                exam.update_details(
                    update.title.as_deref(),
                    update.description,
                    update.max_attempts,
                    now,
                )
            })
            .await?;
        Ok(exam)
    }

    pub(crate) async fn delete_exam(&self, actor: &Actor, exam_id: &str) -> DomainResult<()> {
        let _guard = self.locks.lock(exam_key(exam_id)).await;
        let exam = self.load_exam(exam_id).await?;
        ensure_creator(actor, &exam)?;

        if !exam.is_deletable() {
            return Err(DomainError::invalid_state(format!(
                "cannot delete an exam that is {}",
                exam.status.as_str()
            )));
        }

        self.store.exams.delete(exam_id).await?;
        tracing::info!(exam_id, "Exam deleted");
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn add_choice_question(
        &self,
        actor: &Actor,
        exam_id: &str,
        prompt: &str,
        points: f64,
        choice_type: ChoiceType,
        policy: Option<McqPolicy>,
        options: Vec<OptionDraft>,
        now: PrimitiveDateTime,
    ) -> DomainResult<Question> {
        let (_, question) = self
            .mutate_exam(actor, exam_id, |exam| {
                exam.ensure_draft("add questions")?;
                let question = build_choice_question(
                    prompt,
                    points,
                    choice_type,
                    policy,
                    options,
                    exam.next_order_index(),
                )?;
                exam.add_question(question.clone(), now)?;
                Ok(question)
            })
            .await?;

        tracing::info!(exam_id, question_id = %question.id, "Choice question added");
        Ok(question)
    }

    pub(crate) async fn add_open_question(
        &self,
        actor: &Actor,
        exam_id: &str,
        prompt: &str,
        points: f64,
        now: PrimitiveDateTime,
    ) -> DomainResult<Question> {
        let (_, question) = self
            .mutate_exam(actor, exam_id, |exam| {
                exam.ensure_draft("add questions")?;
                let question = build_open_question(prompt, points, exam.next_order_index())?;
                exam.add_question(question.clone(), now)?;
                Ok(question)
            })
            .await?;

        tracing::info!(exam_id, question_id = %question.id, "Open question added");
        Ok(question)
    }

    pub(crate) async fn remove_question(
        &self,
        actor: &Actor,
        exam_id: &str,
        question_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<bool> {
        let (_, removed) = self
            .mutate_exam(actor, exam_id, |exam| exam.remove_question(question_id, now))
            .await?;
        Ok(removed)
    }

    pub(crate) async fn schedule_exam(
        &self,
        actor: &Actor,
        exam_id: &str,
        start_time: PrimitiveDateTime,
        end_time: PrimitiveDateTime,
        duration_minutes: i32,
        now: PrimitiveDateTime,
    ) -> DomainResult<Exam> {
        let (exam, ()) = self
            .mutate_exam(actor, exam_id, |exam| {
                exam.schedule(start_time, end_time, duration_minutes, now)
            })
            .await?;
        Ok(exam)
    }

    pub(crate) async fn readiness(
        &self,
        actor: &Actor,
        exam_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Vec<String>> {
        let exam = self.load_exam(exam_id).await?;
        ensure_creator(actor, &exam)?;
        Ok(exam.readiness_violations(now))
    }

    pub(crate) async fn mark_ready(
        &self,
        actor: &Actor,
        exam_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Exam> {
        let (exam, ()) = self.mutate_exam(actor, exam_id, |exam| exam.mark_ready(now)).await?;
        tracing::info!(exam_id, "Exam marked ready");
        Ok(exam)
    }

    pub(crate) async fn revert_to_draft(
        &self,
        actor: &Actor,
        exam_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Exam> {
        let (exam, ()) =
            self.mutate_exam(actor, exam_id, |exam| exam.revert_to_draft(now)).await?;
        tracing::info!(exam_id, "Exam returned to draft");
        Ok(exam)
    }

    pub(crate) async fn open_exam(
        &self,
        actor: &Actor,
        exam_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Exam> {
        let (exam, ()) = self.mutate_exam(actor, exam_id, |exam| exam.open(now)).await?;
        metrics::counter!("exams_opened_total").increment(1);
        tracing::info!(exam_id, "Exam opened");
        Ok(exam)
    }

    pub(crate) async fn close_exam(
        &self,
        actor: &Actor,
        exam_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Exam> {
        let (exam, ()) = self.mutate_exam(actor, exam_id, |exam| exam.close(now)).await?;
        metrics::counter!("exams_closed_total").increment(1);
        tracing::info!(exam_id, "Exam closed");
        Ok(exam)
    }

    /// Opens a ready exam once its window begins and closes an open exam after it ends.
    pub(crate) async fn sync_exam_window(
        &self,
        exam_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<WindowTransition> {
        let _guard = self.locks.lock(exam_key(exam_id)).await;
        let mut exam = self.load_exam(exam_id).await?;

        let transition = window_transition(&exam, now);
        match transition {
            WindowTransition::Opened => {
                exam.open(now)?;
                metrics::counter!("exams_opened_total").increment(1);
                tracing::info!(exam_id, "Exam opened automatically at window start");
            }
            WindowTransition::Closed => {
                exam.close(now)?;
                metrics::counter!("exams_closed_total").increment(1);
                tracing::info!(exam_id, "Exam closed automatically after window end");
            }
            WindowTransition::Unchanged => return Ok(transition),
        }

        self.store.exams.save(&mut exam).await?;
        Ok(transition)
    }
}

pub(crate) fn window_transition(exam: &Exam, now: PrimitiveDateTime) -> WindowTransition {
    match (exam.status, exam.start_time, exam.end_time) {
        (ExamStatus::Ready, Some(start), Some(end)) if start <= now && now < end => {
            WindowTransition::Opened
        }
        (ExamStatus::Open, _, Some(end)) if end < now => WindowTransition::Closed,
        _ => WindowTransition::Unchanged,
    }
}
