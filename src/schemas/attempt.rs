use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::{Answer, Attempt, Exam};
use crate::db::types::{AttemptStatus, GradingSource};
use crate::schemas::exam::{ExamSummaryResponse, PublicationResponse, QuestionResponse};
use crate::services::attempt_engine::ManualGrade;
use crate::services::coordinator::{AttemptSnapshot, PublishedGrade};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerSave {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    #[validate(length(max = 20000, message = "content must be at most 20000 characters"))]
    pub(crate) content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeRequest {
    #[validate(range(min = 0.0, message = "points must not be negative"))]
    pub(crate) points: f64,
    #[serde(default)]
    #[validate(length(max = 5000, message = "comment must be at most 5000 characters"))]
    pub(crate) comment: Option<String>,
}

impl GradeRequest {
    pub(crate) fn into_manual_grade(self, question_id: String) -> ManualGrade {
        ManualGrade { question_id, points: self.points, comment: self.comment }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct BulkGradeItem {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[validate(range(min = 0.0, message = "points must not be negative"))]
    pub(crate) points: f64,
    #[serde(default)]
    pub(crate) comment: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct BulkGradeRequest {
    #[validate(length(min = 1, message = "grades must not be empty"), nested)]
    pub(crate) grades: Vec<BulkGradeItem>,
}

impl BulkGradeRequest {
    pub(crate) fn into_manual_grades(self) -> Vec<ManualGrade> {
        self.grades
            .into_iter()
            .map(|item| ManualGrade {
                question_id: item.question_id,
                points: item.points,
                comment: item.comment,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerResponse {
    pub(crate) question_id: String,
    pub(crate) content: String,
    pub(crate) updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) grade: Option<AnswerGradeResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerGradeResponse {
    pub(crate) points_awarded: f64,
    pub(crate) graded: bool,
    pub(crate) graded_by: Option<GradingSource>,
    pub(crate) comment: Option<String>,
    pub(crate) graded_at: Option<String>,
}

impl AnswerResponse {
    pub(crate) fn student_view(answer: &Answer) -> Self {
        Self::from_answer(answer, false)
    }

    pub(crate) fn staff_view(answer: &Answer) -> Self {
        Self::from_answer(answer, true)
    }

    fn from_answer(answer: &Answer, include_grade: bool) -> Self {
        Self {
            question_id: answer.question_id.clone(),
            content: answer.content.clone(),
            updated_at: format_primitive(answer.updated_at),
            grade: include_grade.then(|| AnswerGradeResponse {
                points_awarded: answer.points_awarded,
                graded: answer.graded,
                graded_by: answer.graded_by,
                comment: answer.comment.clone(),
                graded_at: format_optional(answer.graded_at),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) expires_at: String,
    pub(crate) finished_at: Option<String>,
    pub(crate) answers: Vec<AnswerResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) fully_graded: Option<bool>,
}

impl AttemptResponse {
    /// Students see their own answers; points stay hidden until publication.
    pub(crate) fn from_attempt(attempt: &Attempt, include_grades: bool) -> Self {
        Self {
            id: attempt.id.clone(),
            exam_id: attempt.exam_id.clone(),
            student_id: attempt.student_id.clone(),
            attempt_number: attempt.attempt_number,
            status: attempt.status,
            started_at: format_primitive(attempt.started_at),
            expires_at: format_primitive(attempt.expires_at),
            finished_at: format_optional(attempt.finished_at),
            answers: attempt
                .answers
                .iter()
                .map(|answer| AnswerResponse::from_answer(answer, include_grades))
                .collect(),
            score: include_grades.then_some(attempt.score),
            fully_graded: include_grades.then_some(attempt.fully_graded),
        }
    }
}

/// Resume payload: the attempt, the exam it belongs to and progress counters.
#[derive(Debug, Serialize)]
pub(crate) struct AttemptSessionResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) exam: ExamSummaryResponse,
    pub(crate) questions: Vec<QuestionResponse>,
    pub(crate) remaining_seconds: i64,
    pub(crate) answered_count: usize,
    pub(crate) completion_percent: f64,
}

impl AttemptSessionResponse {
    pub(crate) fn from_snapshot(snapshot: &AttemptSnapshot, staff_view: bool) -> Self {
        Self {
            attempt: AttemptResponse::from_attempt(&snapshot.attempt, staff_view),
            exam: ExamSummaryResponse::from(&snapshot.exam),
            questions: sorted_questions(&snapshot.exam, staff_view),
            remaining_seconds: snapshot.remaining_seconds,
            answered_count: snapshot.attempt.answered_count(),
            completion_percent: snapshot.attempt.completion_percent(&snapshot.exam),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RemainingTimeResponse {
    pub(crate) attempt_id: String,
    pub(crate) remaining_seconds: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct PublishedGradeResponse {
    pub(crate) exam: ExamSummaryResponse,
    pub(crate) attempt: AttemptResponse,
    pub(crate) total_points: f64,
    pub(crate) publication: PublicationResponse,
}

impl From<&PublishedGrade> for PublishedGradeResponse {
    fn from(grade: &PublishedGrade) -> Self {
        Self {
            exam: ExamSummaryResponse::from(&grade.exam),
            attempt: AttemptResponse::from_attempt(&grade.attempt, true),
            total_points: grade.exam.total_points(),
            publication: PublicationResponse::from(&grade.publication),
        }
    }
}

fn sorted_questions(exam: &Exam, reveal_answers: bool) -> Vec<QuestionResponse> {
    let mut questions = exam
        .questions
        .iter()
        .map(|question| QuestionResponse::from_question(question, reveal_answers))
        .collect::<Vec<_>>();
    questions.sort_by_key(|question| question.order_index);
    questions
}
