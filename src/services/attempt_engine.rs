use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{Answer, Attempt, Exam};
use crate::db::types::{AttemptStatus, GradingSource};
use crate::services::auto_grading::grade_answer;
use crate::services::errors::{DomainError, DomainResult};
use crate::services::work_timing::{
    compute_deadline, deadline_reached, is_past_deadline, remaining_seconds,
};

#[derive(Debug, Clone)]
pub(crate) struct ManualGrade {
    pub(crate) question_id: String,
    pub(crate) points: f64,
    pub(crate) comment: Option<String>,
}

impl Attempt {
    pub(crate) fn new(
        exam: &Exam,
        student_id: &str,
        attempt_number: i32,
        now: PrimitiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            exam_id: exam.id.clone(),
            student_id: student_id.to_string(),
            attempt_number,
            started_at: now,
            expires_at: compute_deadline(now, exam.duration_minutes, exam.end_time),
            finished_at: None,
            status: AttemptStatus::InProgress,
            answers: Vec::new(),
            score: 0.0,
            fully_graded: false,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    pub(crate) fn is_in_progress(&self) -> bool {
        self.status == AttemptStatus::InProgress
    }

    pub(crate) fn is_expired(&self, now: PrimitiveDateTime) -> bool {
        is_past_deadline(self.expires_at, now)
    }

    pub(crate) fn remaining_seconds(&self, now: PrimitiveDateTime) -> i64 {
        remaining_seconds(self.status, self.expires_at, now)
    }

    pub(crate) fn answer(&self, question_id: &str) -> Option<&Answer> {
        self.answers
            .iter()
            .find(|answer| answer.question_id == question_id)
    }

    /// Returns `true` when this call moved the attempt to `Expired`.
    pub(crate) fn expire_if_overdue(&mut self, exam: &Exam, now: PrimitiveDateTime) -> bool {
        if !self.is_in_progress() || !deadline_reached(self.expires_at, now) {
            return false;
        }

        self.status = AttemptStatus::Expired;
        self.finished_at = Some(self.expires_at);
        self.auto_grade(exam, now);
        self.recompute_score(exam);
        self.updated_at = now;
        true
    }

    /// An overdue attempt is expired as a side effect before the write is rejected.
    pub(crate) fn save_answer(
        &mut self,
        exam: &Exam,
        question_id: &str,
        content: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<&Answer> {
        if self.expire_if_overdue(exam, now) {
            return Err(DomainError::invalid_state("attempt deadline has passed"));
        }
        if !self.is_in_progress() {
            return Err(DomainError::invalid_state("attempt is no longer in progress"));
        }
        if exam.find_question(question_id).is_none() {
            return Err(DomainError::not_found("Question"));
        }

        let index = match self
            .answers
            .iter()
            .position(|answer| answer.question_id == question_id)
        {
            Some(index) => {
                let answer = &mut self.answers[index];
                answer.content = content.to_string();
                answer.updated_at = now;
                index
            }
            None => {
                self.answers.push(Answer {
                    id: Uuid::new_v4().to_string(),
                    question_id: question_id.to_string(),
                    content: content.to_string(),
                    updated_at: now,
                    points_awarded: 0.0,
                    graded: false,
                    graded_by: None,
                    comment: None,
                    graded_at: None,
                });
                self.answers.len() - 1
            }
        };

        self.updated_at = now;
        Ok(&self.answers[index])
    }

    /// Returns the terminal status reached: `Expired` when submitted after the deadline.
    pub(crate) fn submit(&mut self, exam: &Exam, now: PrimitiveDateTime) -> DomainResult<AttemptStatus> {
        if !self.is_in_progress() {
            return Err(DomainError::invalid_state("attempt is no longer in progress"));
        }

        self.status = if self.is_expired(now) {
            AttemptStatus::Expired
        } else {
            AttemptStatus::Submitted
        };
        self.finished_at = Some(now);
        self.auto_grade(exam, now);
        self.recompute_score(exam);
        self.updated_at = now;
        Ok(self.status)
    }

    fn auto_grade(&mut self, exam: &Exam, now: PrimitiveDateTime) {
        for answer in self.answers.iter_mut().filter(|answer| !answer.graded) {
            let Some(question) = exam.find_question(&answer.question_id) else {
                continue;
            };
            if let Some(points) = grade_answer(question, &answer.content) {
                answer.points_awarded = points;
                answer.graded = true;
                answer.graded_by = Some(GradingSource::Auto);
                answer.graded_at = Some(now);
            }
        }
    }

    pub(crate) fn manual_grade(
        &mut self,
        exam: &Exam,
        grade: &ManualGrade,
        now: PrimitiveDateTime,
    ) -> DomainResult<&Answer> {
        self.ensure_gradable()?;

        let question = exam
            .find_question(&grade.question_id)
            .ok_or_else(|| DomainError::not_found("Question"))?;
        if !question.is_open_response() {
            return Err(DomainError::invalid_argument(
                "only open-response questions can be graded manually",
            ));
        }
        if !grade.points.is_finite() || grade.points < 0.0 || grade.points > question.points {
            return Err(DomainError::invalid_argument(format!(
                "grade must be between 0 and {}",
                question.points
            )));
        }

        let index = self.answer_index_or_insert(&grade.question_id, now);
        let answer = &mut self.answers[index];
        answer.points_awarded = grade.points;
        answer.graded = true;
        answer.graded_by = Some(GradingSource::Manual);
        answer.comment = grade.comment.clone();
        answer.graded_at = Some(now);

        self.recompute_score(exam);
        self.updated_at = now;
        Ok(&self.answers[index])
    }

    /// All-or-nothing: the first invalid entry leaves the attempt untouched.
    pub(crate) fn grade_all(
        &mut self,
        exam: &Exam,
        grades: &[ManualGrade],
        now: PrimitiveDateTime,
    ) -> DomainResult<()> {
        if grades.is_empty() {
            return Err(DomainError::invalid_argument("no grades supplied"));
        }

        let mut staged = self.clone();
        for grade in grades {
            staged.manual_grade(exam, grade, now)?;
        }
        *self = staged;
        Ok(())
    }

    pub(crate) fn revoke_grade(
        &mut self,
        exam: &Exam,
        question_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<()> {
        self.ensure_gradable()?;

        let question = exam
            .find_question(question_id)
            .ok_or_else(|| DomainError::not_found("Question"))?;
        if !question.is_open_response() {
            return Err(DomainError::invalid_argument(
                "only open-response grades can be revoked",
            ));
        }

        let answer = self
            .answers
            .iter_mut()
            .find(|answer| answer.question_id == question_id)
            .ok_or_else(|| DomainError::not_found("Answer"))?;
        if !answer.graded {
            return Err(DomainError::invalid_state("answer has no grade to revoke"));
        }

        answer.points_awarded = 0.0;
        answer.graded = false;
        answer.graded_by = None;
        answer.comment = None;
        answer.graded_at = None;

        self.recompute_score(exam);
        self.updated_at = now;
        Ok(())
    }

    fn ensure_gradable(&self) -> DomainResult<()> {
        if !self.status.is_terminal() {
            return Err(DomainError::invalid_state(
                "attempt must be submitted or expired before grading",
            ));
        }
        Ok(())
    }

    fn answer_index_or_insert(&mut self, question_id: &str, now: PrimitiveDateTime) -> usize {
        if let Some(index) = self
            .answers
            .iter()
            .position(|answer| answer.question_id == question_id)
        {
            return index;
        }

        // Graded as "no answer".
        self.answers.push(Answer {
            id: Uuid::new_v4().to_string(),
            question_id: question_id.to_string(),
            content: String::new(),
            updated_at: now,
            points_awarded: 0.0,
            graded: false,
            graded_by: None,
            comment: None,
            graded_at: None,
        });
        self.answers.len() - 1
    }

    pub(crate) fn recompute_score(&mut self, exam: &Exam) {
        self.score = self.answers.iter().fold(0.0, |total, answer| total + answer.points_awarded);
        self.fully_graded = self.status.is_terminal() && self.ungraded_open_questions(exam).is_empty();
    }

    /// Open-response questions of `exam` with no graded answer in this attempt.
    pub(crate) fn ungraded_open_questions<'a>(&self, exam: &'a Exam) -> Vec<&'a str> {
        exam.questions
            .iter()
            .filter(|question| question.is_open_response())
            .filter(|question| {
                !self
                    .answer(&question.id)
                    .is_some_and(|answer| answer.graded)
            })
            .map(|question| question.id.as_str())
            .collect()
    }

    pub(crate) fn answered_count(&self) -> usize {
        self.answers
            .iter()
            .filter(|answer| !answer.content.trim().is_empty())
            .count()
    }

    pub(crate) fn completion_percent(&self, exam: &Exam) -> f64 {
        if exam.questions.is_empty() {
            return 0.0;
        }
        let answered = self.answered_count().min(exam.questions.len());
        answered as f64 * 100.0 / exam.questions.len() as f64
    }
}
