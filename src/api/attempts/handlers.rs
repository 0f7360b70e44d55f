use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::schemas::attempt::{
    AnswerResponse, AnswerSave, AttemptResponse, AttemptSessionResponse, BulkGradeRequest,
    GradeRequest, RemainingTimeResponse,
};

/// Starts a new attempt or resumes the running one for the caller.
pub(crate) async fn start_attempt(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<(StatusCode, Json<AttemptSessionResponse>), ApiError> {
    let now = primitive_now_utc();
    let attempt = state.coordinator().start_attempt(&user, &exam_id, &user.id, now).await?;
    let snapshot = state.coordinator().get_attempt(&user, &attempt.id, now).await?;
    let status = if attempt.started_at == now { StatusCode::CREATED } else { StatusCode::OK };

    Ok((status, Json(AttemptSessionResponse::from_snapshot(&snapshot, false))))
}

pub(super) async fn get_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<AttemptSessionResponse>, ApiError> {
    let snapshot =
        state.coordinator().get_attempt(&user, &attempt_id, primitive_now_utc()).await?;
    Ok(Json(AttemptSessionResponse::from_snapshot(&snapshot, false)))
}

pub(super) async fn save_answer(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
    Json(payload): Json<AnswerSave>,
) -> Result<Json<AnswerResponse>, ApiError> {
    payload.validate()?;

    let answer = state
        .coordinator()
        .save_answer(&user, &attempt_id, &payload.question_id, &payload.content, primitive_now_utc())
        .await?;
    Ok(Json(AnswerResponse::student_view(&answer)))
}

pub(super) async fn submit_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let attempt =
        state.coordinator().submit_attempt(&user, &attempt_id, primitive_now_utc()).await?;
    Ok(Json(AttemptResponse::from_attempt(&attempt, false)))
}

pub(super) async fn remaining_time(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<RemainingTimeResponse>, ApiError> {
    let remaining_seconds =
        state.coordinator().remaining_time(&user, &attempt_id, primitive_now_utc()).await?;
    Ok(Json(RemainingTimeResponse { attempt_id, remaining_seconds }))
}

pub(super) async fn attempt_for_grading(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<AttemptSessionResponse>, ApiError> {
    let snapshot = state
        .coordinator()
        .attempt_for_grading(&user, &attempt_id, primitive_now_utc())
        .await?;
    Ok(Json(AttemptSessionResponse::from_snapshot(&snapshot, true)))
}

pub(super) async fn grade_answer(
    Path((attempt_id, question_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    payload.validate()?;

    let answer = state
        .coordinator()
        .manual_grade(
            &user,
            &attempt_id,
            payload.into_manual_grade(question_id),
            primitive_now_utc(),
        )
        .await?;
    Ok(Json(AnswerResponse::staff_view(&answer)))
}

pub(super) async fn grade_all(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
    Json(payload): Json<BulkGradeRequest>,
) -> Result<Json<AttemptResponse>, ApiError> {
    payload.validate()?;

    let attempt = state
        .coordinator()
        .grade_all(&user, &attempt_id, payload.into_manual_grades(), primitive_now_utc())
        .await?;
    Ok(Json(AttemptResponse::from_attempt(&attempt, true)))
}

pub(super) async fn revoke_grade(
    Path((attempt_id, question_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let attempt = state
        .coordinator()
        .revoke_grade(&user, &attempt_id, &question_id, primitive_now_utc())
        .await?;
    Ok(Json(AttemptResponse::from_attempt(&attempt, true)))
}
