use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::types::UserRole;
use crate::schemas::exam::{
    EnrollRequest, EnrollmentResponse, ExamResponse, ExamUpdate, PublicationResponse,
    PublishRequest, ReadinessResponse, ScheduleRequest,
};
use crate::services::coordinator::ExamDetailsUpdate;

pub(in crate::api::exams) async fn get_exam(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = state.coordinator().get_exam(&user, &exam_id).await?;
    let reveal_answers = user.role != UserRole::Student;
    Ok(Json(ExamResponse::from_exam(&exam, reveal_answers)))
}

pub(in crate::api::exams) async fn update_exam(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    payload.validate()?;

    let update = ExamDetailsUpdate {
        title: payload.title,
        description: payload.description,
        max_attempts: payload.max_attempts,
    };
    let exam =
        state.coordinator().update_exam(&user, &exam_id, update, primitive_now_utc()).await?;
    Ok(Json(ExamResponse::from_exam(&exam, true)))
}

pub(in crate::api::exams) async fn delete_exam(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.coordinator().delete_exam(&user, &exam_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(in crate::api::exams) async fn remove_question(
    Path((exam_id, question_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<StatusCode, ApiError> {
    let removed = state
        .coordinator()
        .remove_question(&user, &exam_id, &question_id, primitive_now_utc())
        .await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Question not found".to_string()))
    }
}

pub(in crate::api::exams) async fn schedule_exam(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
    Json(payload): Json<ScheduleRequest>,
) -> Result<Json<ExamResponse>, ApiError> {
    payload.validate()?;

    let exam = state
        .coordinator()
        .schedule_exam(
            &user,
            &exam_id,
            to_primitive_utc(payload.start_time),
            to_primitive_utc(payload.end_time),
            payload.duration_minutes,
            primitive_now_utc(),
        )
        .await?;
    Ok(Json(ExamResponse::from_exam(&exam, true)))
}

pub(in crate::api::exams) async fn readiness(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<ReadinessResponse>, ApiError> {
    let violations = state.coordinator().readiness(&user, &exam_id, primitive_now_utc()).await?;
    Ok(Json(ReadinessResponse { ready: violations.is_empty(), violations }))
}

pub(in crate::api::exams) async fn mark_ready(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = state.coordinator().mark_ready(&user, &exam_id, primitive_now_utc()).await?;
    Ok(Json(ExamResponse::from_exam(&exam, true)))
}

pub(in crate::api::exams) async fn revert_to_draft(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = state.coordinator().revert_to_draft(&user, &exam_id, primitive_now_utc()).await?;
    Ok(Json(ExamResponse::from_exam(&exam, true)))
}

pub(in crate::api::exams) async fn open_exam(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = state.coordinator().open_exam(&user, &exam_id, primitive_now_utc()).await?;
    Ok(Json(ExamResponse::from_exam(&exam, true)))
}

pub(in crate::api::exams) async fn close_exam(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = state.coordinator().close_exam(&user, &exam_id, primitive_now_utc()).await?;
    Ok(Json(ExamResponse::from_exam(&exam, true)))
}

pub(in crate::api::exams) async fn enroll_student(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
    Json(payload): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    payload.validate()?;

    let enrollment = state
        .coordinator()
        .enroll(&user, &exam_id, payload.student_id.trim(), primitive_now_utc())
        .await?;
    Ok((StatusCode::CREATED, Json(EnrollmentResponse::from(&enrollment))))
}

pub(in crate::api::exams) async fn unenroll_student(
    Path((exam_id, student_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let enrollment = state
        .coordinator()
        .unenroll(&user, &exam_id, &student_id, primitive_now_utc())
        .await?;
    Ok(Json(EnrollmentResponse::from(&enrollment)))
}

pub(in crate::api::exams) async fn publish_grades(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
    payload: Option<Json<PublishRequest>>,
) -> Result<Json<PublicationResponse>, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    payload.validate()?;

    let publication = state
        .coordinator()
        .publish_grades(&user, &exam_id, payload.message, primitive_now_utc())
        .await?;
    Ok(Json(PublicationResponse::from(&publication)))
}

pub(in crate::api::exams) async fn unpublish_grades(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<PublicationResponse>, ApiError> {
    let publication =
        state.coordinator().unpublish_grades(&user, &exam_id, primitive_now_utc()).await?;
    Ok(Json(PublicationResponse::from(&publication)))
}

pub(in crate::api::exams) async fn publication_status(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<PublicationResponse>, ApiError> {
    let publication = state.coordinator().publication_status(&user, &exam_id).await?;
    Ok(Json(
        publication
            .as_ref()
            .map(PublicationResponse::from)
            .unwrap_or_else(|| PublicationResponse::unpublished(&exam_id)),
    ))
}
