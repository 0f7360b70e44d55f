use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::db::types::{
    AttemptStatus, EnrollmentStatus, ExamStatus, GradingSource, McqPolicy, UserRole,
};

/// Authenticated caller of a coordinator operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Actor {
    pub(crate) id: String,
    pub(crate) role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) start_time: Option<PrimitiveDateTime>,
    pub(crate) end_time: Option<PrimitiveDateTime>,
    pub(crate) duration_minutes: i32,
    pub(crate) max_attempts: i32,
    pub(crate) status: ExamStatus,
    pub(crate) created_by: String,
    pub(crate) questions: Vec<Question>,
    pub(crate) enrollments: Vec<Enrollment>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) opened_at: Option<PrimitiveDateTime>,
    pub(crate) closed_at: Option<PrimitiveDateTime>,
    #[serde(default)]
    pub(crate) revision: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) prompt: String,
    pub(crate) points: f64,
    pub(crate) order_index: i32,
    pub(crate) kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum QuestionKind {
    SingleChoice { options: Vec<AnswerOption> },
    MultipleChoice { options: Vec<AnswerOption>, policy: McqPolicy },
    TrueFalse { options: Vec<AnswerOption> },
    OpenResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AnswerOption {
    pub(crate) id: String,
    pub(crate) label: String,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Enrollment {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) enrolled_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) finished_at: Option<PrimitiveDateTime>,
    pub(crate) status: AttemptStatus,
    pub(crate) answers: Vec<Answer>,
    pub(crate) score: f64,
    pub(crate) fully_graded: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    #[serde(default)]
    pub(crate) revision: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Answer {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) content: String,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) points_awarded: f64,
    pub(crate) graded: bool,
    pub(crate) graded_by: Option<GradingSource>,
    pub(crate) comment: Option<String>,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct GradePublication {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) published: bool,
    pub(crate) message: Option<String>,
    pub(crate) published_at: Option<PrimitiveDateTime>,
    pub(crate) withdrawn_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    #[serde(default)]
    pub(crate) revision: i64,
}
