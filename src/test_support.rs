use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::api;
use crate::core::{config::Settings, security, state::AppState};
use crate::db::types::UserRole;
use crate::repositories::Store;
use crate::services::coordinator::ExamCoordinator;

const TEST_SECRET_KEY: &str = "test-secret";

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    _guard: OwnedMutexGuard<()>,
}

impl TestContext {
    pub(crate) fn token(&self, user_id: &str, role: UserRole) -> String {
        bearer_token(user_id, role, self.state.settings())
    }
}

/// Serialises tests that read or mutate process environment variables.
pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("EXAMGU_ENV", "test");
    std::env::set_var("EXAMGU_STRICT_CONFIG", "0");
    std::env::set_var("SECRET_KEY", TEST_SECRET_KEY);
    std::env::set_var("ALGORITHM", "HS256");
    std::env::set_var("STORE_BACKEND", "memory");
    std::env::set_var("EXAM_SWEEP_IN_PROCESS", "0");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::remove_var("API_V1_STR");
    std::env::remove_var("PROJECT_NAME");
    std::env::remove_var("EXAM_SWEEP_INTERVAL_SECONDS");
    std::env::remove_var("EXAM_WINDOW_SYNC_INTERVAL_SECONDS");
}

pub(crate) async fn setup_test_context() -> TestContext {
    setup_test_context_with(|| {}).await
}

/// Like `setup_test_context`, with extra environment tweaks applied before settings load.
pub(crate) async fn setup_test_context_with(configure: impl FnOnce()) -> TestContext {
    let guard = env_lock().await;
    set_test_env();
    configure();

    let settings = Settings::load().expect("settings");
    let coordinator = Arc::new(ExamCoordinator::new(Store::in_memory()));
    let state = AppState::new(settings, coordinator);
    let app = api::router::router(state.clone());

    TestContext { state, app, _guard: guard }
}

pub(crate) fn bearer_token(user_id: &str, role: UserRole, settings: &Settings) -> String {
    security::create_access_token(user_id, role, settings, None).expect("token")
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}

pub(crate) const TEACHER_ID: &str = "teacher-1";
pub(crate) const STUDENT_ID: &str = "student-1";

/// Exam opened through the API: one single-choice question worth 2 points
/// ("Paris" is correct), one open question worth 3 points, `STUDENT_ID` enrolled.
pub(crate) struct SeededExam {
    pub(crate) exam_id: String,
    pub(crate) choice_id: String,
    pub(crate) open_id: String,
}

pub(crate) async fn seed_open_exam(ctx: &TestContext) -> SeededExam {
    use time::format_description::well_known::Rfc3339;
    use tower::ServiceExt;

    let teacher = ctx.token(TEACHER_ID, UserRole::Teacher);
    let now = time::OffsetDateTime::now_utc();
    let start = (now - time::Duration::minutes(5)).format(&Rfc3339).expect("start");
    let end = (now + time::Duration::hours(2)).format(&Rfc3339).expect("end");

    let send = |method: Method, uri: String, body: Option<serde_json::Value>| {
        let app = ctx.app.clone();
        let request = json_request(method, &uri, Some(&teacher), body);
        async move {
            let response = app.oneshot(request).await.expect("response");
            let status = response.status();
            let json = read_json(response).await;
            assert!(status.is_success(), "{uri} failed with {status}: {json}");
            json
        }
    };

    let exam = send(
        Method::POST,
        "/api/v1/exams".to_string(),
        Some(serde_json::json!({ "title": "Geography", "description": "Capitals" })),
    )
    .await;
    let exam_id = exam["id"].as_str().expect("exam id").to_string();
    let base = format!("/api/v1/exams/{exam_id}");

    let choice = send(
        Method::POST,
        format!("{base}/questions"),
        Some(serde_json::json!({
            "type": "single_choice",
            "prompt": "Capital of France?",
            "points": 2.0,
            "options": [
                { "label": "Paris", "is_correct": true },
                { "label": "Lyon" }
            ]
        })),
    )
    .await;
    let open = send(
        Method::POST,
        format!("{base}/questions"),
        Some(serde_json::json!({
            "type": "open_response",
            "prompt": "Describe the Seine basin.",
            "points": 3.0
        })),
    )
    .await;

    send(
        Method::PUT,
        format!("{base}/schedule"),
        Some(serde_json::json!({
            "start_time": start,
            "end_time": end,
            "duration_minutes": 30
        })),
    )
    .await;
    send(
        Method::POST,
        format!("{base}/enrollments"),
        Some(serde_json::json!({ "student_id": STUDENT_ID })),
    )
    .await;
    send(Method::POST, format!("{base}/open"), None).await;

    SeededExam {
        exam_id,
        choice_id: choice["id"].as_str().expect("choice id").to_string(),
        open_id: open["id"].as_str().expect("open id").to_string(),
    }
}
