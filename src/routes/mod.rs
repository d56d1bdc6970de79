mod analytics;
mod health;
mod questions;
mod responses;
mod sessions;
mod students;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .route("/api/student", post(students::create_or_login))
        .route("/api/student/:student_id", get(students::get_student))
        .route("/api/session/start", post(sessions::start))
        .route("/api/session/end/:session_id", post(sessions::end))
        .route("/api/session/:session_id", get(sessions::summary))
        .route("/api/question/next/:session_id", get(questions::next_question))
        .route("/api/hint/:session_id/:question_id", get(questions::hint))
        .route("/api/response/submit", post(responses::submit))
        .route(
            "/api/response/:session_id/:question_id",
            get(responses::previous),
        )
        .route(
            "/api/analytics/student/:student_id/summary",
            get(analytics::student_summary),
        )
        .route(
            "/api/analytics/export/csv/:student_id",
            get(analytics::export_csv),
        )
        .route(
            "/api/analytics/export/windows/:student_id",
            get(analytics::export_windows_csv),
        )
        .route(
            "/api/analytics/export/all-data/:student_id",
            get(analytics::export_all_data),
        )
        .with_state(state)
}
