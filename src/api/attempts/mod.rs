mod handlers;

use axum::{routing::get, routing::post, routing::put, Router};

use crate::core::state::AppState;

pub(crate) use handlers::start_attempt;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:attempt_id", get(handlers::get_attempt))
        .route("/:attempt_id/answers", put(handlers::save_answer))
        .route("/:attempt_id/submit", post(handlers::submit_attempt))
        .route("/:attempt_id/remaining", get(handlers::remaining_time))
        .route("/:attempt_id/grading", get(handlers::attempt_for_grading))
        .route("/:attempt_id/grades", put(handlers::grade_all))
        .route(
            "/:attempt_id/grades/:question_id",
            put(handlers::grade_answer).delete(handlers::revoke_grade),
        )
}
