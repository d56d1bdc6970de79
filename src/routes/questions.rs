use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::db::operations::{questions, responses, sessions};
use crate::engine::selector::{self, Selection};
use crate::engine::types::{AdaptationCadence, HintRecord};
use crate::response::AppError;
use crate::state::AppState;

fn completion_payload(session: &sessions::Session, message: &str) -> serde_json::Value {
    json!({
        "success": true,
        "status": "completed",
        "message": message,
        "final_score": session.score_percentage,
        "correct_answers": session.correct_answers,
        "total_questions": session.total_questions,
    })
}

pub async fn next_question(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError> {
    let mut session = sessions::get(state.pool(), &session_id)
        .await?
        .ok_or_else(|| AppError::not_found("Session not found"))?;

    let unique_answered = sessions::unique_answered_count(state.pool(), &session.id).await?;

    if unique_answered >= session.total_questions {
        if session.status != "completed" {
            sessions::end(state.pool(), &session.id, "completed").await?;
            state.registry().remove(&session.id).await;
            session.status = "completed".to_string();
        }
        return Ok(Json(completion_payload(&session, "Test completed successfully!")).into_response());
    }

    match session.status.as_str() {
        "active" | "paused" => {}
        // A session closed early can resume while questions remain.
        "completed" => {
            sessions::set_status(state.pool(), &session.id, "active").await?;
            session.status = "active".to_string();
        }
        other => {
            return Err(AppError::bad_request(format!(
                "Session is not active (status: {other})"
            )));
        }
    }

    let candidates =
        questions::unanswered_candidates(state.pool(), &session.id, &session.subject).await?;

    let selection = {
        let mut rng = rand::rng();
        selector::select(&candidates, session.current_difficulty, &mut rng)
    };

    let chosen_id = match selection {
        Selection::Chosen { id, stage } => {
            tracing::debug!(
                session_id = %session.id,
                stage = stage.as_str(),
                target = session.current_difficulty,
                "question selected"
            );
            id
        }
        Selection::Exhausted => {
            sessions::end(state.pool(), &session.id, "completed").await?;
            state.registry().remove(&session.id).await;
            session.status = "completed".to_string();
            return Ok(Json(completion_payload(
                &session,
                "Test completed! No more questions available.",
            ))
            .into_response());
        }
    };

    let question = questions::get(state.pool(), &chosen_id)
        .await?
        .ok_or_else(|| AppError::not_found("Question not found"))?;

    // The answer key stays server-side until submission.
    Ok(Json(json!({
        "success": true,
        "question": {
            "question_id": question.id,
            "question_text": question.question_text,
            "options": {
                "A": question.option_a,
                "B": question.option_b,
                "C": question.option_c,
                "D": question.option_d,
            },
            "difficulty": question.difficulty,
            "hints_available": question.hints.len(),
        },
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct HintQuery {
    #[serde(default)]
    pub hint_index: usize,
}

pub async fn hint(
    State(state): State<AppState>,
    Path((session_id, question_id)): Path<(String, String)>,
    Query(query): Query<HintQuery>,
) -> Result<Response, AppError> {
    let session = sessions::get(state.pool(), &session_id)
        .await?
        .ok_or_else(|| AppError::not_found("Session not found"))?;
    let question = questions::get(state.pool(), &question_id)
        .await?
        .ok_or_else(|| AppError::not_found("Question not found"))?;

    if question.hints.is_empty() || query.hint_index >= question.hints.len() {
        return Err(AppError::bad_request("No more hints available"));
    }

    let record = HintRecord {
        hint_index: query.hint_index as u32,
        timestamp_ms: Utc::now().timestamp_millis(),
    };

    let recorded =
        responses::append_hint(state.pool(), &session.id, &question.id, record).await?;
    if recorded.is_none() {
        // Not answered yet: hold the hint until the response arrives so
        // no phantom response row is created.
        let runtime = state
            .registry()
            .runtime(
                &session.id,
                AdaptationCadence::parse(&session.cadence),
                session.current_difficulty,
            )
            .await;
        runtime.lock().await.record_pending_hint(&question.id, record);
    }

    Ok(Json(json!({
        "success": true,
        "hint_data": {
            "hint": question.hints[query.hint_index],
            "hint_number": query.hint_index + 1,
            "total_hints": question.hints.len(),
        },
    }))
    .into_response())
}
