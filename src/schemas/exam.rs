use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::{AnswerOption, Enrollment, Exam, GradePublication, Question, QuestionKind};
use crate::db::types::{AttemptStatus, EnrollmentStatus, ExamStatus, McqPolicy};
use crate::services::coordinator::{ExamResultRow, PendingGrading};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamUpdate {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub(crate) title: Option<String>,
    /// Absent keeps the description, `null` clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub(crate) description: Option<Option<String>>,
    #[serde(default)]
    #[serde(alias = "maxAttempts")]
    #[validate(range(min = 1, message = "max_attempts must be at least 1"))]
    pub(crate) max_attempts: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ScheduleRequest {
    #[serde(alias = "startTime", deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) start_time: OffsetDateTime,
    #[serde(alias = "endTime", deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) end_time: OffsetDateTime,
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum QuestionType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    OpenResponse,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub(crate) prompt: String,
    #[validate(range(exclusive_min = 0.0, message = "points must be positive"))]
    pub(crate) points: f64,
    #[serde(default)]
    pub(crate) policy: Option<McqPolicy>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) options: Vec<OptionCreate>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct OptionCreate {
    #[validate(length(min = 1, message = "option label must not be empty"))]
    pub(crate) label: String,
    #[serde(default)]
    #[serde(alias = "isCorrect")]
    pub(crate) is_correct: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct EnrollRequest {
    #[serde(alias = "studentId")]
    #[validate(length(min = 1, message = "student_id must not be empty"))]
    pub(crate) student_id: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct PublishRequest {
    #[serde(default)]
    #[validate(length(max = 2000, message = "message must be at most 2000 characters"))]
    pub(crate) message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OptionResponse {
    pub(crate) id: String,
    pub(crate) label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) is_correct: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) question_type: &'static str,
    pub(crate) prompt: String,
    pub(crate) points: f64,
    pub(crate) order_index: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) policy: Option<McqPolicy>,
    pub(crate) options: Vec<OptionResponse>,
}

impl QuestionResponse {
    /// Correct flags are only revealed to staff.
    pub(crate) fn from_question(question: &Question, reveal_answers: bool) -> Self {
        let policy = match question.kind {
            QuestionKind::MultipleChoice { policy, .. } => Some(policy),
            _ => None,
        };

        Self {
            id: question.id.clone(),
            question_type: question.kind_label(),
            prompt: question.prompt.clone(),
            points: question.points,
            order_index: question.order_index,
            policy,
            options: question
                .options()
                .iter()
                .map(|option: &AnswerOption| OptionResponse {
                    id: option.id.clone(),
                    label: option.label.clone(),
                    is_correct: reveal_answers.then_some(option.is_correct),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) status: ExamStatus,
    pub(crate) start_time: Option<String>,
    pub(crate) end_time: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) max_attempts: i32,
    pub(crate) created_by: String,
    pub(crate) total_points: f64,
    pub(crate) questions: Vec<QuestionResponse>,
    pub(crate) enrollment_count: usize,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) opened_at: Option<String>,
    pub(crate) closed_at: Option<String>,
}

impl ExamResponse {
    pub(crate) fn from_exam(exam: &Exam, reveal_answers: bool) -> Self {
        let mut questions = exam
            .questions
            .iter()
            .map(|question| QuestionResponse::from_question(question, reveal_answers))
            .collect::<Vec<_>>();
        questions.sort_by_key(|question| question.order_index);

        Self {
            id: exam.id.clone(),
            title: exam.title.clone(),
            description: exam.description.clone(),
            status: exam.status,
            start_time: format_optional(exam.start_time),
            end_time: format_optional(exam.end_time),
            duration_minutes: exam.duration_minutes,
            max_attempts: exam.max_attempts,
            created_by: exam.created_by.clone(),
            total_points: exam.total_points(),
            questions,
            enrollment_count: exam
                .enrollments
                .iter()
                .filter(|enrollment| enrollment.status == EnrollmentStatus::Active)
                .count(),
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
            opened_at: format_optional(exam.opened_at),
            closed_at: format_optional(exam.closed_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummaryResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) status: ExamStatus,
    pub(crate) start_time: Option<String>,
    pub(crate) end_time: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) question_count: usize,
    pub(crate) total_points: f64,
}

impl From<&Exam> for ExamSummaryResponse {
    fn from(exam: &Exam) -> Self {
        Self {
            id: exam.id.clone(),
            title: exam.title.clone(),
            status: exam.status,
            start_time: format_optional(exam.start_time),
            end_time: format_optional(exam.end_time),
            duration_minutes: exam.duration_minutes,
            question_count: exam.questions.len(),
            total_points: exam.total_points(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ReadinessResponse {
    pub(crate) ready: bool,
    pub(crate) violations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentResponse {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) enrolled_at: String,
    pub(crate) updated_at: String,
}

impl From<&Enrollment> for EnrollmentResponse {
    fn from(enrollment: &Enrollment) -> Self {
        Self {
            id: enrollment.id.clone(),
            student_id: enrollment.student_id.clone(),
            status: enrollment.status,
            enrolled_at: format_primitive(enrollment.enrolled_at),
            updated_at: format_primitive(enrollment.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PublicationResponse {
    pub(crate) exam_id: String,
    pub(crate) published: bool,
    pub(crate) message: Option<String>,
    pub(crate) published_at: Option<String>,
    pub(crate) withdrawn_at: Option<String>,
}

impl PublicationResponse {
    pub(crate) fn unpublished(exam_id: &str) -> Self {
        Self {
            exam_id: exam_id.to_string(),
            published: false,
            message: None,
            published_at: None,
            withdrawn_at: None,
        }
    }
}

impl From<&GradePublication> for PublicationResponse {
    fn from(publication: &GradePublication) -> Self {
        Self {
            exam_id: publication.exam_id.clone(),
            published: publication.published,
            message: publication.message.clone(),
            published_at: format_optional(publication.published_at),
            withdrawn_at: format_optional(publication.withdrawn_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResultResponse {
    pub(crate) attempt_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) score: f64,
    pub(crate) total_points: f64,
    pub(crate) fully_graded: bool,
    pub(crate) finished_at: Option<String>,
}

impl From<ExamResultRow> for ExamResultResponse {
    fn from(row: ExamResultRow) -> Self {
        Self {
            attempt_id: row.attempt_id,
            student_id: row.student_id,
            attempt_number: row.attempt_number,
            status: row.status,
            score: row.score,
            total_points: row.total_points,
            fully_graded: row.fully_graded,
            finished_at: format_optional(row.finished_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PendingGradingResponse {
    pub(crate) attempt_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) finished_at: Option<String>,
    pub(crate) ungraded_question_ids: Vec<String>,
}

impl From<PendingGrading> for PendingGradingResponse {
    fn from(item: PendingGrading) -> Self {
        Self {
            attempt_id: item.attempt_id,
            student_id: item.student_id,
            attempt_number: item.attempt_number,
            finished_at: format_optional(item.finished_at),
            ungraded_question_ids: item.ungraded_question_ids,
        }
    }
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

pub(crate) fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // datetime-local inputs arrive without an offset; treat them as UTC.
    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_offset_datetime_flexible<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_offset_datetime_flexible(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}
