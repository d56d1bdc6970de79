use axum::http::StatusCode;
use serde_json::json;
use tutor_backend_rust::logstore::{PER_QUESTION_COLUMNS, PER_WINDOW_COLUMNS};

mod common;

/// Runs one full five-question session and returns the student id.
async fn complete_session(app: &axum::Router, pool: &sqlx::SqlitePool) -> String {
    let ids = common::seed_questions(pool, "math", &[0.45, 0.5, 0.55, 0.5, 0.45]).await;

    let (_, body) = common::post_json(
        app,
        "/api/student",
        json!({"email": "export@example.com", "name": "Ex"}),
    )
    .await;
    let student_id = body["student"]["id"].as_str().unwrap().to_string();

    let (_, body) = common::post_json(
        app,
        "/api/session/start",
        json!({"student_id": student_id, "subject": "math", "num_questions": 5}),
    )
    .await;
    let session_id = body["session"]["session_id"].as_str().unwrap().to_string();

    for id in &ids {
        let (status, _) = common::post_json(
            app,
            "/api/response/submit",
            json!({
                "session_id": session_id,
                "question_id": id,
                "student_answer": "A",
                "response_time_seconds": 5.0,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    student_id
}

#[tokio::test]
async fn question_csv_has_fixed_header_and_one_row_per_response() {
    let (app, pool) = common::create_test_app().await;
    let student_id = complete_session(&app, &pool).await;

    let (status, body) =
        common::get_json(&app, &format!("/api/analytics/export/csv/{student_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        body["filename"],
        format!("student_{student_id}_data.csv")
    );

    let csv = body["data"].as_str().unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 6, "header plus five responses");
    assert_eq!(lines[0], PER_QUESTION_COLUMNS.join(","));

    // Only the fifth response carries a window-boundary decision.
    for line in &lines[1..5] {
        assert!(!line.contains("increase_difficulty"));
    }
    assert!(lines[5].contains("increase_difficulty"));
}

#[tokio::test]
async fn window_csv_has_fixed_header_and_one_row_per_window() {
    let (app, pool) = common::create_test_app().await;
    let student_id = complete_session(&app, &pool).await;

    let (status, body) =
        common::get_json(&app, &format!("/api/analytics/export/windows/{student_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["filename"],
        format!("student_{student_id}_windows.csv")
    );

    let csv = body["data"].as_str().unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2, "header plus one completed window");
    assert_eq!(lines[0], PER_WINDOW_COLUMNS.join(","));

    let fields: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(fields[1], "0", "first window number");
    assert_eq!(fields[3], "5", "window size");
    assert_eq!(fields[4], "5", "correct count");
    assert_eq!(fields[6], "1", "accuracy rounds clean");
}

#[tokio::test]
async fn all_data_export_rolls_up_the_whole_history() {
    let (app, pool) = common::create_test_app().await;
    let student_id = complete_session(&app, &pool).await;

    let (status, body) = common::get_json(
        &app,
        &format!("/api/analytics/export/all-data/{student_id}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let data = &body["data"];
    assert_eq!(data["student_id"], student_id.as_str());
    assert!(data["export_date"].is_string());

    let summary = &data["summary"];
    assert_eq!(summary["total_sessions"], 1);
    assert_eq!(summary["total_questions_answered"], 5);
    assert_eq!(summary["total_correct_answers"], 5);
    assert_eq!(summary["overall_score_percentage"], 100.0);
    assert_eq!(summary["subjects_studied"], json!(["math"]));
    assert!(summary["average_engagement"].as_f64().unwrap() > 0.0);

    let sessions = data["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["responses"].as_array().unwrap().len(), 5);
    assert_eq!(sessions[0]["engagement_metrics"].as_array().unwrap().len(), 5);
    assert_eq!(sessions[0]["adaptation_logs"].as_array().unwrap().len(), 1);
    assert_eq!(sessions[0]["window_summaries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn exports_for_unknown_students_are_not_found() {
    let (app, _pool) = common::create_test_app().await;

    for uri in [
        "/api/analytics/export/csv/missing",
        "/api/analytics/export/windows/missing",
        "/api/analytics/export/all-data/missing",
        "/api/analytics/student/missing/summary",
    ] {
        let (status, body) = common::get_json(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn student_summary_aggregates_sessions() {
    let (app, pool) = common::create_test_app().await;
    let student_id = complete_session(&app, &pool).await;

    let (status, body) = common::get_json(
        &app,
        &format!("/api/analytics/student/{student_id}/summary"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let summary = &body["summary"];
    assert_eq!(summary["total_sessions"], 1);
    assert_eq!(summary["total_questions_answered"], 5);
    assert_eq!(summary["overall_accuracy"], 100.0);
}
