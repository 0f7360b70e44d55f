use axum::extract::{Path, State};
use axum::Json;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::db::types::UserRole;
use crate::schemas::attempt::{AttemptResponse, PublishedGradeResponse};
use crate::schemas::exam::{
    EnrollmentResponse, ExamResultResponse, ExamSummaryResponse, PendingGradingResponse,
};

pub(in crate::api::exams) async fn list_exams(
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<Vec<ExamSummaryResponse>>, ApiError> {
    let exams = state.coordinator().list_exams(&user).await?;
    Ok(Json(exams.iter().map(ExamSummaryResponse::from).collect()))
}

pub(in crate::api::exams) async fn list_enrollments(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<Vec<EnrollmentResponse>>, ApiError> {
    let enrollments = state.coordinator().list_enrollments(&user, &exam_id).await?;
    Ok(Json(enrollments.iter().map(EnrollmentResponse::from).collect()))
}

pub(in crate::api::exams) async fn list_attempts(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<Vec<AttemptResponse>>, ApiError> {
    let attempts = state.coordinator().list_attempts(&user, &exam_id).await?;
    let include_grades = user.role != UserRole::Student;

    Ok(Json(
        attempts
            .iter()
            .map(|attempt| AttemptResponse::from_attempt(attempt, include_grades))
            .collect(),
    ))
}

pub(in crate::api::exams) async fn pending_grading(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<Vec<PendingGradingResponse>>, ApiError> {
    let pending = state.coordinator().pending_grading(&user, &exam_id).await?;
    Ok(Json(pending.into_iter().map(PendingGradingResponse::from).collect()))
}

pub(in crate::api::exams) async fn exam_results(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<Vec<ExamResultResponse>>, ApiError> {
    let rows = state.coordinator().exam_results(&user, &exam_id).await?;
    Ok(Json(rows.into_iter().map(ExamResultResponse::from).collect()))
}

pub(in crate::api::exams) async fn my_grade(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<PublishedGradeResponse>, ApiError> {
    let grade = state.coordinator().student_note_detail(&user, &exam_id, &user.id).await?;
    Ok(Json(PublishedGradeResponse::from(&grade)))
}
