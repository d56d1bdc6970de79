use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::db::operations::{metrics, responses, sessions, students};
use crate::engine::types::AdaptationCadence;
use crate::response::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default = "default_num_questions")]
    pub num_questions: i64,
    /// "window" (default) adapts at window boundaries; "per_response"
    /// steps on cumulative accuracy after every answer.
    #[serde(default)]
    pub cadence: Option<String>,
}

fn default_num_questions() -> i64 {
    10
}

pub async fn start(
    State(state): State<AppState>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<Response, AppError> {
    if payload.student_id.trim().is_empty() || payload.subject.trim().is_empty() {
        return Err(AppError::validation("student_id and subject are required"));
    }
    if payload.num_questions < 1 {
        return Err(AppError::validation("num_questions must be at least 1"));
    }

    let student = students::get(state.pool(), &payload.student_id)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))?;

    let cadence = payload
        .cadence
        .as_deref()
        .map(AdaptationCadence::parse)
        .unwrap_or_default();

    let registry = state.registry();
    let bounds = &registry.config().adaptation;
    let initial_difficulty = student
        .preferred_difficulty
        .clamp(bounds.min_difficulty, bounds.max_difficulty);

    let session = sessions::create(
        state.pool(),
        &student.id,
        payload.subject.trim(),
        payload.num_questions,
        initial_difficulty,
        cadence.as_str(),
    )
    .await?;

    // The cadence is fixed for the life of the session.
    registry
        .runtime(&session.id, cadence, initial_difficulty)
        .await;
    students::touch_last_activity(state.pool(), &student.id).await?;

    tracing::info!(
        session_id = %session.id,
        student_id = %student.id,
        subject = %session.subject,
        cadence = cadence.as_str(),
        initial_difficulty,
        "session started"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "session": {
                "session_id": session.id,
                "student_id": session.student_id,
                "subject": session.subject,
                "total_questions": session.total_questions,
                "current_difficulty": session.current_difficulty,
                "cadence": session.cadence,
                "status": session.status,
            },
        })),
    )
        .into_response())
}

fn duration_seconds(started_at: &str, ended_at: Option<&str>) -> i64 {
    let start = DateTime::parse_from_rfc3339(started_at).map(|t| t.with_timezone(&Utc));
    let end = ended_at
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    match start {
        Ok(start) => (end - start).num_seconds().max(0),
        Err(_) => 0,
    }
}

pub async fn end(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError> {
    let session = sessions::get(state.pool(), &session_id)
        .await?
        .ok_or_else(|| AppError::not_found("Session not found"))?;

    sessions::end(state.pool(), &session.id, "completed").await?;
    state.registry().remove(&session.id).await;

    let ended = sessions::get(state.pool(), &session.id)
        .await?
        .ok_or_else(|| AppError::not_found("Session not found"))?;

    tracing::info!(session_id = %ended.id, final_score = ended.score_percentage, "session ended");

    Ok(Json(json!({
        "success": true,
        "session_summary": {
            "session_id": ended.id,
            "status": ended.status,
            "final_score": ended.score_percentage,
            "correct_answers": ended.correct_answers,
            "total_questions": ended.total_questions,
            "duration_seconds": duration_seconds(&ended.started_at, ended.ended_at.as_deref()),
        },
    }))
    .into_response())
}

pub async fn summary(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError> {
    let session = sessions::get(state.pool(), &session_id)
        .await?
        .ok_or_else(|| AppError::not_found("Session not found"))?;

    let rows = responses::list_by_session(state.pool(), &session.id).await?;
    let total_hints: i64 = rows.iter().map(|r| r.hints_used).sum();
    let total_attempts: i64 = rows.iter().map(|r| r.attempts).sum();
    let avg_response_time = if rows.is_empty() {
        0.0
    } else {
        rows.iter().map(|r| r.response_time_seconds).sum::<f64>() / rows.len() as f64
    };
    let correct = rows.iter().filter(|r| r.is_correct).count() as i64;

    let trace = metrics::list_by_session(state.pool(), &session.id).await?;
    let average_engagement = if trace.is_empty() {
        0.0
    } else {
        trace.iter().map(|m| m.engagement_score).sum::<f64>() / trace.len() as f64
    };
    let difficulties: Vec<f64> = trace.iter().filter_map(|m| m.resulting_difficulty).collect();
    let min_difficulty = difficulties.iter().copied().fold(f64::INFINITY, f64::min);
    let max_difficulty = difficulties.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let windows = metrics::list_windows_by_session(state.pool(), &session.id).await?;
    let window_scores: Vec<f64> = windows.iter().map(|w| w.window_score).collect();
    let window_stats = (!window_scores.is_empty()).then(|| {
        json!({
            "windows_completed": window_scores.len(),
            "mean_score": window_scores.iter().sum::<f64>() / window_scores.len() as f64,
            "best_score": window_scores.iter().copied().fold(f64::MIN, f64::max),
            "worst_score": window_scores.iter().copied().fold(f64::MAX, f64::min),
        })
    });

    Ok(Json(json!({
        "success": true,
        "summary": {
            "session": session,
            "statistics": {
                "total_questions_answered": rows.len(),
                "correct_answers": correct,
                "incorrect_answers": rows.len() as i64 - correct,
                "final_score_percentage": session.score_percentage,
                "total_hints_used": total_hints,
                "average_response_time": avg_response_time,
                "total_attempts": total_attempts,
                "average_engagement": average_engagement,
                "difficulty_trajectory": {
                    "min": if difficulties.is_empty() { session.current_difficulty } else { min_difficulty },
                    "max": if difficulties.is_empty() { session.current_difficulty } else { max_difficulty },
                    "final": session.current_difficulty,
                },
                "window_stats": window_stats,
            },
            "responses": rows,
        },
    }))
    .into_response())
}
