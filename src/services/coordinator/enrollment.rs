use time::PrimitiveDateTime;

use super::{ensure_creator_or_admin, ExamCoordinator};
use crate::db::models::{Actor, Enrollment};
use crate::services::errors::DomainResult;
use crate::services::locks::exam_key;

impl ExamCoordinator {
    pub(crate) async fn enroll(
        &self,
        actor: &Actor,
        exam_id: &str,
        student_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Enrollment> {
        let _guard = self.locks.lock(exam_key(exam_id)).await;
        let mut exam = self.load_exam(exam_id).await?;
        ensure_creator_or_admin(actor, &exam)?;

        let enrollment = exam.enroll(student_id, now)?;
        self.store.exams.save(&mut exam).await?;

        tracing::info!(exam_id, student_id, enrollment_id = %enrollment.id, "Student enrolled");
        Ok(enrollment)
    }

    pub(crate) async fn unenroll(
        &self,
        actor: &Actor,
        exam_id: &str,
        student_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<Enrollment> {
        let _guard = self.locks.lock(exam_key(exam_id)).await;
        let mut exam = self.load_exam(exam_id).await?;
        ensure_creator_or_admin(actor, &exam)?;

        let enrollment = exam.suspend_enrollment(student_id, now)?;
        self.store.exams.save(&mut exam).await?;

        tracing::info!(exam_id, student_id, "Enrollment suspended");
        Ok(enrollment)
    }

    pub(crate) async fn list_enrollments(
        &self,
        actor: &Actor,
        exam_id: &str,
    ) -> DomainResult<Vec<Enrollment>> {
        let exam = self.load_exam(exam_id).await?;
        ensure_creator_or_admin(actor, &exam)?;

        let mut enrollments = exam.enrollments;
        enrollments.sort_by(|left, right| left.enrolled_at.cmp(&right.enrolled_at));
        Ok(enrollments)
    }
}
