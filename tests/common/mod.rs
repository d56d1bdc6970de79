#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

use tutor_backend_rust::db::operations::questions::{self, NewQuestion};

pub async fn create_test_app() -> (Router, SqlitePool) {
    let pool = tutor_backend_rust::db::memory_pool()
        .await
        .expect("in-memory database");
    let app = tutor_backend_rust::build_app(pool.clone());
    (app, pool)
}

pub async fn seed_questions(pool: &SqlitePool, subject: &str, difficulties: &[f64]) -> Vec<String> {
    let mut ids = Vec::new();
    for (i, &difficulty) in difficulties.iter().enumerate() {
        let q = questions::insert(
            pool,
            &NewQuestion {
                subject: subject.to_string(),
                topic: "arithmetic".to_string(),
                difficulty,
                question_text: format!("Question {i}?"),
                option_a: "first".to_string(),
                option_b: "second".to_string(),
                option_c: "third".to_string(),
                option_d: "fourth".to_string(),
                correct_option: "A".to_string(),
                explanation: "first is right".to_string(),
                hints: vec![format!("hint one for {i}"), format!("hint two for {i}")],
            },
        )
        .await
        .expect("seed question");
        ids.push(q.id);
    }
    ids
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
