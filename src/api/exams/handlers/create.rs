use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::ChoiceType;
use crate::schemas::exam::{ExamCreate, ExamResponse, QuestionCreate, QuestionResponse, QuestionType};
use crate::services::question_bank::OptionDraft;

pub(in crate::api::exams) async fn create_exam(
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate()?;

    let exam = state
        .coordinator()
        .create_exam(&user, &payload.title, payload.description, primitive_now_utc())
        .await?;

    Ok((StatusCode::CREATED, Json(ExamResponse::from_exam(&exam, true))))
}

pub(in crate::api::exams) async fn add_question(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate()?;
    let now = primitive_now_utc();

    let choice_type = match payload.question_type {
        QuestionType::SingleChoice => ChoiceType::Single,
        QuestionType::MultipleChoice => ChoiceType::Multiple,
        QuestionType::TrueFalse => ChoiceType::TrueFalse,
        QuestionType::OpenResponse => {
            if !payload.options.is_empty() {
                return Err(ApiError::BadRequest(
                    "open_response questions take no options".to_string(),
                ));
            }
            let question = state
                .coordinator()
                .add_open_question(&user, &exam_id, &payload.prompt, payload.points, now)
                .await?;
            return Ok((StatusCode::CREATED, Json(QuestionResponse::from_question(&question, true))));
        }
    };

    let drafts = payload
        .options
        .into_iter()
        .map(|option| OptionDraft { label: option.label, is_correct: option.is_correct })
        .collect();

    let question = state
        .coordinator()
        .add_choice_question(
            &user,
            &exam_id,
            &payload.prompt,
            payload.points,
            choice_type,
            payload.policy,
            drafts,
            now,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(QuestionResponse::from_question(&question, true))))
}
