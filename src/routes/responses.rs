use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::db::operations::{adaptation, metrics, questions, responses, sessions};
use crate::engine::types::{
    AdaptationCadence, AnswerOption, EngagementLevel, FacialMetrics, HintRecord, OptionChange,
    ResponseSample,
};
use crate::response::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub question_id: String,
    #[serde(default)]
    pub student_answer: String,
    #[serde(default)]
    pub response_time_seconds: f64,
    #[serde(default)]
    pub initial_option: Option<String>,
    #[serde(default)]
    pub final_option: Option<String>,
    #[serde(default)]
    pub option_change_count: i64,
    #[serde(default)]
    pub option_change_history: Vec<OptionChange>,
    #[serde(default)]
    pub navigation_frequency: i64,
    #[serde(default)]
    pub navigation_pattern: Option<String>,
    #[serde(default)]
    pub time_spent_per_question: f64,
    #[serde(default)]
    pub inactivity_duration_ms: i64,
    #[serde(default)]
    pub question_index: i64,
    #[serde(default)]
    pub hesitation_flags: Vec<String>,
    #[serde(default)]
    pub knowledge_gaps: Vec<String>,
    /// Hint views recorded client-side while the question was open.
    #[serde(default)]
    pub hints_used: Vec<HintRecord>,
    #[serde(default)]
    pub facial_metrics: Option<FacialMetrics>,
}

/// Union-by-timestamp merge so a retried submission or a revisit never
/// drops or duplicates a hint record.
fn merge_hints(base: &mut Vec<HintRecord>, extra: impl IntoIterator<Item = HintRecord>) {
    for record in extra {
        if !base.iter().any(|h| h.timestamp_ms == record.timestamp_ms) {
            base.push(record);
        }
    }
    base.sort_by_key(|h| h.timestamp_ms);
}

pub async fn submit(
    State(state): State<AppState>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Response, AppError> {
    if payload.session_id.is_empty()
        || payload.question_id.is_empty()
        || payload.student_answer.is_empty()
    {
        return Err(AppError::validation("Missing required fields"));
    }
    let answer = AnswerOption::parse(&payload.student_answer)
        .ok_or_else(|| AppError::validation("student_answer must be one of A, B, C, D"))?;
    if !payload.response_time_seconds.is_finite() || payload.response_time_seconds <= 0.0 {
        return Err(AppError::validation(
            "response_time_seconds must be a positive number",
        ));
    }

    let session = sessions::get(state.pool(), &payload.session_id)
        .await?
        .ok_or_else(|| AppError::not_found("Session not found"))?;
    if session.status != "active" && session.status != "paused" {
        return Err(AppError::bad_request(format!(
            "Session is not active (status: {})",
            session.status
        )));
    }

    let question = questions::get(state.pool(), &payload.question_id)
        .await?
        .ok_or_else(|| AppError::not_found("Question not found"))?;

    let is_correct = question.correct_option.eq_ignore_ascii_case(answer.as_str());
    let now = Utc::now();
    let now_ms = now.timestamp_millis();

    let registry = state.registry();
    let runtime_arc = registry
        .runtime(
            &session.id,
            AdaptationCadence::parse(&session.cadence),
            session.current_difficulty,
        )
        .await;
    // Sole writer for this session's state for the rest of the request.
    let mut runtime = runtime_arc.lock().await;

    // A concurrent submit may have moved the difficulty between the
    // first read and lock acquisition; re-read so the decision starts
    // from the value the previous writer persisted.
    let session = sessions::get(state.pool(), &session.id)
        .await?
        .ok_or_else(|| AppError::not_found("Session not found"))?;

    let pending_hints = runtime.take_pending_hints(&question.id);

    let row = match responses::get_by_session_question(state.pool(), &session.id, &question.id)
        .await?
    {
        Some(mut existing) => {
            // Revisit: rewrite in place, keep unique_answered flat.
            existing.student_answer = answer.as_str().to_string();
            existing.is_correct = is_correct;
            existing.response_time_seconds = payload.response_time_seconds;
            existing.submitted_at_ms = now_ms;
            existing.attempts += 1;
            existing.final_option = payload.final_option.clone().or(existing.final_option.take());
            existing.option_change_count += payload.option_change_count;
            existing
                .option_change_history
                .extend(payload.option_change_history.iter().copied());
            existing.navigation_frequency += payload.navigation_frequency;
            if let Some(pattern) = &payload.navigation_pattern {
                existing.navigation_pattern = pattern.clone();
            }
            existing.time_spent_per_question += payload.time_spent_per_question;
            existing.inactivity_duration_ms += payload.inactivity_duration_ms;
            existing.hesitation_flags.extend(payload.hesitation_flags.clone());
            existing.knowledge_gaps = payload.knowledge_gaps.clone();
            merge_hints(
                &mut existing.hint_records,
                payload.hints_used.iter().copied().chain(pending_hints),
            );
            existing.hints_used = existing.hint_records.len() as i64;
            responses::update(state.pool(), &existing).await?;
            existing
        }
        None => {
            let mut hint_records = payload.hints_used.clone();
            merge_hints(&mut hint_records, pending_hints);
            let hints_used = hint_records.len() as i64;
            responses::insert(
                state.pool(),
                responses::NewResponse {
                    session_id: session.id.clone(),
                    question_id: question.id.clone(),
                    student_answer: answer.as_str().to_string(),
                    is_correct,
                    response_time_seconds: payload.response_time_seconds,
                    submitted_at_ms: now_ms,
                    hints_used,
                    hint_records,
                    initial_option: payload.initial_option.clone(),
                    final_option: payload.final_option.clone(),
                    option_change_count: payload.option_change_count,
                    option_change_history: payload.option_change_history.clone(),
                    navigation_frequency: payload.navigation_frequency,
                    navigation_pattern: payload
                        .navigation_pattern
                        .clone()
                        .unwrap_or_else(|| "sequential".to_string()),
                    time_spent_per_question: payload.time_spent_per_question,
                    inactivity_duration_ms: payload.inactivity_duration_ms,
                    question_index: payload.question_index,
                    hesitation_flags: payload.hesitation_flags.clone(),
                    knowledge_gaps: payload.knowledge_gaps.clone(),
                },
            )
            .await?
        }
    };

    let (unique_answered, correct_count) =
        responses::accuracy_counts(state.pool(), &session.id).await?;
    sessions::update_score(state.pool(), &session.id, correct_count).await?;
    let cumulative_accuracy = if unique_answered > 0 {
        correct_count as f64 / unique_answered as f64
    } else {
        0.0
    };

    let config = registry.config();
    let samples =
        responses::recent_samples(state.pool(), &session.id, config.window_size).await?;
    let latest = ResponseSample {
        is_correct,
        response_time_seconds: payload.response_time_seconds,
        hints_used: row.hints_used as u32,
        timestamp_ms: now_ms,
    };

    let eval = runtime.evaluate_response(
        &samples,
        latest,
        session.current_difficulty,
        cumulative_accuracy,
        payload.facial_metrics.as_ref(),
        now,
    );

    metrics::record(
        state.pool(),
        &metrics::MetricContext {
            session_id: &session.id,
            question_id: &question.id,
            question_number: unique_answered,
            question_difficulty: question.difficulty,
            is_correct,
            response_time_seconds: payload.response_time_seconds,
            resulting_difficulty: eval.new_difficulty,
        },
        &eval.indicators,
        &eval.fused,
        &config.engagement,
    )
    .await?;

    if let Some(decision) = &eval.decision {
        let (trigger_metric, trigger_value) = match &eval.window_score {
            Some(ws) => ("window_score", ws.score),
            None => ("cumulative_accuracy", cumulative_accuracy),
        };
        adaptation::record(
            state.pool(),
            &adaptation::LogContext {
                session_id: &session.id,
                student_id: &session.student_id,
                question_number: unique_answered,
                trigger_metric,
                trigger_value,
                old_difficulty: session.current_difficulty,
            },
            decision,
        )
        .await?;
        tracing::info!(
            session_id = %session.id,
            action = decision.primary_action.as_str(),
            delta = decision.difficulty_delta,
            new_difficulty = decision.new_difficulty,
            "difficulty adapted"
        );
    }
    if (eval.new_difficulty - session.current_difficulty).abs() > f64::EPSILON {
        sessions::update_difficulty(state.pool(), &session.id, eval.new_difficulty).await?;
    }

    if let Some(summary) = &eval.window_summary {
        metrics::record_window_summary(state.pool(), &session.id, summary).await?;
    }

    drop(runtime);

    let current_score = if session.total_questions > 0 {
        correct_count as f64 * 100.0 / session.total_questions as f64
    } else {
        0.0
    };
    let level = EngagementLevel::from_score(
        eval.fused.score,
        config.engagement.low_engagement,
        config.engagement.high_engagement,
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "is_correct": is_correct,
            "correct_answer": question.correct_option,
            "explanation": question.explanation,
            "current_score": current_score,
            "correct_count": correct_count,
            "total_answered": unique_answered,
            "unique_answered": unique_answered,
            "current_difficulty": eval.new_difficulty,
            "engagement": {
                "engagement_score": eval.fused.score,
                "engagement_level": level.as_str(),
                "categorical_state": eval.fused.categorical_state.as_str(),
                "confidence": eval.fused.confidence,
                "primary_driver": eval.fused.primary_driver.clone(),
            },
            "decision": eval.decision.as_ref().map(|d| json!({
                "primary_action": d.primary_action.as_str(),
                "secondary_actions": d.secondary_actions.iter().map(|a| a.as_str()).collect::<Vec<_>>(),
                "difficulty_delta": d.difficulty_delta,
                "rationale": d.rationale,
                "engagement_influenced": d.engagement_influenced,
            })),
        })),
    )
        .into_response())
}

pub async fn previous(
    State(state): State<AppState>,
    Path((session_id, question_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let row = responses::get_by_session_question(state.pool(), &session_id, &question_id)
        .await?
        .ok_or_else(|| AppError::not_found("No previous response found"))?;

    Ok(Json(json!({
        "success": true,
        "response": {
            "question_id": row.question_id,
            "student_answer": row.student_answer,
            "is_correct": row.is_correct,
            "hints_used": row.hints_used,
            "hint_records": row.hint_records,
            "final_option": row.final_option,
            "attempts": row.attempts,
        },
    }))
    .into_response())
}
