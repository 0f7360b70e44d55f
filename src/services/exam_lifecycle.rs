use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{Enrollment, Exam, Question};
use crate::db::types::{EnrollmentStatus, ExamStatus};
use crate::services::errors::{DomainError, DomainResult};
use crate::services::question_bank::structural_violations;
use crate::services::work_timing::{validate_schedule, window_minutes};

pub(crate) const DEFAULT_MAX_ATTEMPTS: i32 = 1;

impl Exam {
    pub(crate) fn new(
        title: &str,
        description: Option<String>,
        created_by: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::invalid_argument("exam title must not be empty"));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description,
            start_time: None,
            end_time: None,
            duration_minutes: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            status: ExamStatus::Draft,
            created_by: created_by.to_string(),
            questions: Vec::new(),
            enrollments: Vec::new(),
            created_at: now,
            updated_at: now,
            opened_at: None,
            closed_at: None,
            revision: 0,
        })
    }

    pub(crate) fn ensure_draft(&self, action: &str) -> DomainResult<()> {
        if self.status != ExamStatus::Draft {
            return Err(DomainError::invalid_state(format!(
                "cannot {action} while exam is {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    pub(crate) fn update_details(
        &mut self,
        title: Option<&str>,
        description: Option<Option<String>>,
        max_attempts: Option<i32>,
        now: PrimitiveDateTime,
    ) -> DomainResult<()> {
        self.ensure_draft("edit exam details")?;

        let title = match title {
            Some(value) if value.trim().is_empty() => {
                return Err(DomainError::invalid_argument("exam title must not be empty"));
            }
            Some(value) => Some(value.trim().to_string()),
            None => None,
        };
        if let Some(limit) = max_attempts {
            if limit < 1 {
                return Err(DomainError::invalid_argument("max_attempts must be at least 1"));
            }
        }

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(limit) = max_attempts {
            self.max_attempts = limit;
        }
        self.updated_at = now;
        Ok(())
    }

    pub(crate) fn schedule(
        &mut self,
        start_time: PrimitiveDateTime,
        end_time: PrimitiveDateTime,
        duration_minutes: i32,
        now: PrimitiveDateTime,
    ) -> DomainResult<()> {
        self.ensure_draft("reschedule")?;
        validate_schedule(start_time, end_time, duration_minutes)?;

        self.start_time = Some(start_time);
        self.end_time = Some(end_time);
        self.duration_minutes = duration_minutes;
        self.updated_at = now;
        Ok(())
    }

    pub(crate) fn total_points(&self) -> f64 {
        self.questions.iter().map(|question| question.points).sum()
    }

    pub(crate) fn find_question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == question_id)
    }

    pub(crate) fn next_order_index(&self) -> i32 {
        self.questions
            .iter()
            .map(|question| question.order_index + 1)
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn add_question(
        &mut self,
        question: Question,
        now: PrimitiveDateTime,
    ) -> DomainResult<()> {
        self.ensure_draft("add questions")?;
        self.questions.push(question);
        self.questions.sort_by_key(|question| question.order_index);
        self.updated_at = now;
        Ok(())
    }

    /// Returns `false` when the question does not belong to this exam.
    pub(crate) fn remove_question(
        &mut self,
        question_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<bool> {
        self.ensure_draft("remove questions")?;

        let before = self.questions.len();
        self.questions.retain(|question| question.id != question_id);
        if self.questions.len() == before {
            return Ok(false);
        }

        for (index, question) in self.questions.iter_mut().enumerate() {
            question.order_index = index as i32;
        }
        self.updated_at = now;
        Ok(true)
    }

    pub(crate) fn readiness_violations(&self, now: PrimitiveDateTime) -> Vec<String> {
        let mut violations = Vec::new();

        if self.title.trim().is_empty() {
            violations.push("title is empty".to_string());
        }

        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                if end < start {
                    violations.push("end_time is before start_time".to_string());
                }
                if self.duration_minutes <= 0 {
                    violations.push("duration_minutes must be positive".to_string());
                } else if i64::from(self.duration_minutes) > window_minutes(start, end) {
                    violations.push("duration_minutes exceeds the exam window".to_string());
                }
                if end <= now {
                    violations.push("exam window has already ended".to_string());
                }
            }
            _ => violations.push("exam window is not scheduled".to_string()),
        }

        if self.questions.is_empty() {
            violations.push("exam has no questions".to_string());
        } else if self.total_points() <= 0.0 {
            violations.push("total points must be positive".to_string());
        }

        for (index, question) in self.questions.iter().enumerate() {
            for problem in structural_violations(question) {
                violations.push(format!("question {}: {problem}", index + 1));
            }
        }

        violations
    }

    pub(crate) fn mark_ready(&mut self, now: PrimitiveDateTime) -> DomainResult<()> {
        self.ensure_draft("mark ready")?;
        self.ensure_no_violations(now)?;
        self.status = ExamStatus::Ready;
        self.updated_at = now;
        Ok(())
    }

    fn ensure_no_violations(&self, now: PrimitiveDateTime) -> DomainResult<()> {
        let violations = self.readiness_violations(now);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::NotReady(violations))
        }
    }

    /// Draft exams pass through Ready on the way.
    pub(crate) fn open(&mut self, now: PrimitiveDateTime) -> DomainResult<()> {
        match self.status {
            ExamStatus::Draft => self.mark_ready(now)?,
            ExamStatus::Ready => self.ensure_no_violations(now)?,
            ExamStatus::Open | ExamStatus::Closed => {
                return Err(DomainError::invalid_state(format!(
                    "exam is already {}",
                    self.status.as_str()
                )));
            }
        }

        self.status = ExamStatus::Open;
        self.opened_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub(crate) fn close(&mut self, now: PrimitiveDateTime) -> DomainResult<()> {
        if self.status == ExamStatus::Closed {
            return Err(DomainError::invalid_state("exam is already closed"));
        }
        self.status = ExamStatus::Closed;
        self.closed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub(crate) fn revert_to_draft(&mut self, now: PrimitiveDateTime) -> DomainResult<()> {
        if self.status != ExamStatus::Ready {
            return Err(DomainError::invalid_state(format!(
                "only ready exams can return to draft (exam is {})",
                self.status.as_str()
            )));
        }
        self.status = ExamStatus::Draft;
        self.updated_at = now;
        Ok(())
    }

    pub(crate) fn is_available(&self, now: PrimitiveDateTime) -> bool {
        match (self.status, self.start_time, self.end_time) {
            (ExamStatus::Open, Some(start), Some(end)) => start <= now && now <= end,
            _ => false,
        }
    }

    pub(crate) fn is_deletable(&self) -> bool {
        matches!(self.status, ExamStatus::Draft | ExamStatus::Ready)
    }

    pub(crate) fn enrollment(&self, student_id: &str) -> Option<&Enrollment> {
        self.enrollments
            .iter()
            .find(|enrollment| enrollment.student_id == student_id)
    }

    pub(crate) fn has_active_enrollment(&self, student_id: &str) -> bool {
        self.enrollment(student_id)
            .is_some_and(|enrollment| enrollment.status == EnrollmentStatus::Active)
    }

    /// Reactivates a suspended enrollment instead of adding a second one.
    pub(crate) fn enroll(
        &mut self,
        student_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Enrollment> {
        if student_id.trim().is_empty() {
            return Err(DomainError::invalid_argument("student_id must not be empty"));
        }

        if let Some(existing) = self
            .enrollments
            .iter_mut()
            .find(|enrollment| enrollment.student_id == student_id)
        {
            if existing.status == EnrollmentStatus::Active {
                return Err(DomainError::Conflict(format!(
                    "student {student_id} is already enrolled"
                )));
            }
            existing.status = EnrollmentStatus::Active;
            existing.updated_at = now;
            let reactivated = existing.clone();
            self.updated_at = now;
            return Ok(reactivated);
        }

        let enrollment = Enrollment {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            status: EnrollmentStatus::Active,
            enrolled_at: now,
            updated_at: now,
        };
        self.enrollments.push(enrollment.clone());
        self.updated_at = now;
        Ok(enrollment)
    }

    pub(crate) fn suspend_enrollment(
        &mut self,
        student_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Enrollment> {
        let enrollment = self
            .enrollments
            .iter_mut()
            .find(|enrollment| enrollment.student_id == student_id)
            .ok_or_else(|| DomainError::not_found("Enrollment"))?;

        if enrollment.status == EnrollmentStatus::Suspended {
            return Err(DomainError::invalid_state("enrollment is already suspended"));
        }

        enrollment.status = EnrollmentStatus::Suspended;
        enrollment.updated_at = now;
        let suspended = enrollment.clone();
        self.updated_at = now;
        Ok(suspended)
    }
}
