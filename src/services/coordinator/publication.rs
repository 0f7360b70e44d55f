use time::PrimitiveDateTime;

use super::{ensure_creator, ExamCoordinator};
use crate::db::models::{Actor, GradePublication};
use crate::services::errors::{DomainError, DomainResult};
use crate::services::locks::publication_key;
use crate::services::publication::count_ungraded_open_answers;

impl ExamCoordinator {
    pub(crate) async fn publish_grades(
        &self,
        actor: &Actor,
        exam_id: &str,
        message: Option<String>,
        now: PrimitiveDateTime,
    ) -> DomainResult<GradePublication> {
        let _guard = self.locks.lock(publication_key(exam_id)).await;
        let exam = self.load_exam(exam_id).await?;
        ensure_creator(actor, &exam)?;

        let attempts = self.attempts_for_exam(exam_id).await?;
        let ungraded = count_ungraded_open_answers(&exam, &attempts);

        let mut publication = self
            .publication_for_exam(exam_id)
            .await?
            .unwrap_or_else(|| GradePublication::new(exam_id, now));

        if let Err(err) = publication.publish(now, message, ungraded) {
            tracing::debug!(exam_id, ungraded, error = %err, "Publication rejected");
            return Err(err);
        }
        self.store.publications.save(&mut publication).await?;

        metrics::counter!("grades_published_total").increment(1);
        tracing::info!(exam_id, publication_id = %publication.id, "Grades published");
        Ok(publication)
    }

    pub(crate) async fn unpublish_grades(
        &self,
        actor: &Actor,
        exam_id: &str,
        now: PrimitiveDateTime,
    ) -> DomainResult<GradePublication> {
        let _guard = self.locks.lock(publication_key(exam_id)).await;
        let exam = self.load_exam(exam_id).await?;
        ensure_creator(actor, &exam)?;

        let mut publication = self
            .publication_for_exam(exam_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Grade publication"))?;
        publication.withdraw(now)?;
        self.store.publications.save(&mut publication).await?;

        tracing::info!(exam_id, publication_id = %publication.id, "Grades withdrawn");
        Ok(publication)
    }

    pub(crate) async fn publication_status(
        &self,
        actor: &Actor,
        exam_id: &str,
    ) -> DomainResult<Option<GradePublication>> {
        let exam = self.load_exam(exam_id).await?;
        ensure_creator(actor, &exam)?;
        self.publication_for_exam(exam_id).await
    }
}
