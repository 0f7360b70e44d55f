mod handlers;

use axum::{routing::get, routing::post, routing::put, Router};

use crate::api::attempts;
use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_exam).get(handlers::list_exams))
        .route(
            "/:exam_id",
            get(handlers::get_exam).patch(handlers::update_exam).delete(handlers::delete_exam),
        )
        .route("/:exam_id/questions", post(handlers::add_question))
        .route(
            "/:exam_id/questions/:question_id",
            axum::routing::delete(handlers::remove_question),
        )
        .route("/:exam_id/schedule", put(handlers::schedule_exam))
        .route("/:exam_id/readiness", get(handlers::readiness))
        .route("/:exam_id/ready", post(handlers::mark_ready))
        .route("/:exam_id/draft", post(handlers::revert_to_draft))
        .route("/:exam_id/open", post(handlers::open_exam))
        .route("/:exam_id/close", post(handlers::close_exam))
        .route(
            "/:exam_id/enrollments",
            get(handlers::list_enrollments).post(handlers::enroll_student),
        )
        .route(
            "/:exam_id/enrollments/:student_id",
            axum::routing::delete(handlers::unenroll_student),
        )
        .route(
            "/:exam_id/attempts",
            post(attempts::start_attempt).get(handlers::list_attempts),
        )
        .route("/:exam_id/pending-grading", get(handlers::pending_grading))
        .route("/:exam_id/results", get(handlers::exam_results))
        .route(
            "/:exam_id/publication",
            get(handlers::publication_status)
                .post(handlers::publish_grades)
                .delete(handlers::unpublish_grades),
        )
        .route("/:exam_id/my-grade", get(handlers::my_grade))
}
