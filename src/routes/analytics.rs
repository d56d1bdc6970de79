use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::operations::{responses, sessions, students};
use crate::logstore;
use crate::response::AppError;
use crate::state::AppState;

pub async fn student_summary(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Response, AppError> {
    let student = students::get(state.pool(), &student_id)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))?;

    let session_list = sessions::list_by_student(state.pool(), &student.id).await?;
    let mut total_answered: i64 = 0;
    let mut correct: i64 = 0;
    let mut score_sum = 0.0;
    let mut study_time: i64 = 0;

    for session in &session_list {
        let rows = responses::list_by_session(state.pool(), &session.id).await?;
        total_answered += rows.len() as i64;
        correct += rows.iter().filter(|r| r.is_correct).count() as i64;
        score_sum += session.score_percentage;
        study_time += rows.iter().map(|r| r.response_time_seconds).sum::<f64>() as i64;
    }

    let overall_accuracy = if total_answered > 0 {
        correct as f64 / total_answered as f64 * 100.0
    } else {
        0.0
    };
    let average_score = if session_list.is_empty() {
        0.0
    } else {
        score_sum / session_list.len() as f64
    };

    Ok(Json(json!({
        "success": true,
        "student_id": student.id,
        "summary": {
            "total_sessions": session_list.len(),
            "total_questions_answered": total_answered,
            "correct_answers": correct,
            "overall_accuracy": overall_accuracy,
            "average_session_score": average_score,
            "total_study_time_seconds": study_time,
            "last_activity": student.last_activity,
        },
    }))
    .into_response())
}

pub async fn export_csv(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Response, AppError> {
    ensure_student(&state, &student_id).await?;
    let csv = logstore::student_question_csv(state.pool(), &student_id).await?;
    Ok(Json(json!({
        "success": true,
        "data": csv,
        "filename": format!("student_{student_id}_data.csv"),
    }))
    .into_response())
}

pub async fn export_windows_csv(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Response, AppError> {
    ensure_student(&state, &student_id).await?;
    let csv = logstore::student_window_csv(state.pool(), &student_id).await?;
    Ok(Json(json!({
        "success": true,
        "data": csv,
        "filename": format!("student_{student_id}_windows.csv"),
    }))
    .into_response())
}

pub async fn export_all_data(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Response, AppError> {
    let export = logstore::student_export_json(state.pool(), &student_id)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))?;
    Ok(Json(json!({ "success": true, "data": export })).into_response())
}

async fn ensure_student(state: &AppState, student_id: &str) -> Result<(), AppError> {
    students::get(state.pool(), student_id)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))?;
    Ok(())
}
