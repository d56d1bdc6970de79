use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::{new_id, now_iso};
use crate::engine::types::{HintRecord, OptionChange, ResponseSample};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRow {
    pub id: String,
    pub session_id: String,
    pub question_id: String,
    pub student_answer: String,
    pub is_correct: bool,
    pub response_time_seconds: f64,
    pub timestamp: String,
    pub submitted_at_ms: i64,
    pub hints_used: i64,
    pub hint_records: Vec<HintRecord>,
    pub attempts: i64,
    pub initial_option: Option<String>,
    pub final_option: Option<String>,
    pub option_change_count: i64,
    pub option_change_history: Vec<OptionChange>,
    pub navigation_frequency: i64,
    pub navigation_pattern: String,
    pub time_spent_per_question: f64,
    pub inactivity_duration_ms: i64,
    pub question_index: i64,
    pub hesitation_flags: Vec<String>,
    pub knowledge_gaps: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewResponse {
    pub session_id: String,
    pub question_id: String,
    pub student_answer: String,
    pub is_correct: bool,
    pub response_time_seconds: f64,
    pub submitted_at_ms: i64,
    pub hints_used: i64,
    pub hint_records: Vec<HintRecord>,
    pub initial_option: Option<String>,
    pub final_option: Option<String>,
    pub option_change_count: i64,
    pub option_change_history: Vec<OptionChange>,
    pub navigation_frequency: i64,
    pub navigation_pattern: String,
    pub time_spent_per_question: f64,
    pub inactivity_duration_ms: i64,
    pub question_index: i64,
    pub hesitation_flags: Vec<String>,
    pub knowledge_gaps: Vec<String>,
}

fn json_vec<T: serde::de::DeserializeOwned>(row: &sqlx::sqlite::SqliteRow, col: &str) -> Vec<T> {
    let raw: String = row.get(col);
    serde_json::from_str(&raw).unwrap_or_default()
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}

fn row_to_response(row: &sqlx::sqlite::SqliteRow) -> ResponseRow {
    ResponseRow {
        id: row.get("id"),
        session_id: row.get("session_id"),
        question_id: row.get("question_id"),
        student_answer: row.get("student_answer"),
        is_correct: row.get::<i64, _>("is_correct") != 0,
        response_time_seconds: row.get("response_time_seconds"),
        timestamp: row.get("timestamp"),
        submitted_at_ms: row.get("submitted_at_ms"),
        hints_used: row.get("hints_used"),
        hint_records: json_vec(row, "hint_records"),
        attempts: row.get("attempts"),
        initial_option: row.get("initial_option"),
        final_option: row.get("final_option"),
        option_change_count: row.get("option_change_count"),
        option_change_history: json_vec(row, "option_change_history"),
        navigation_frequency: row.get("navigation_frequency"),
        navigation_pattern: row.get("navigation_pattern"),
        time_spent_per_question: row.get("time_spent_per_question"),
        inactivity_duration_ms: row.get("inactivity_duration_ms"),
        question_index: row.get("question_index"),
        hesitation_flags: json_vec(row, "hesitation_flags"),
        knowledge_gaps: json_vec(row, "knowledge_gaps"),
    }
}

pub async fn get_by_session_question(
    pool: &SqlitePool,
    session_id: &str,
    question_id: &str,
) -> Result<Option<ResponseRow>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT * FROM "responses" WHERE "session_id" = $1 AND "question_id" = $2 LIMIT 1"#,
    )
    .bind(session_id)
    .bind(question_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(row_to_response))
}

pub async fn insert(pool: &SqlitePool, new: NewResponse) -> Result<ResponseRow, sqlx::Error> {
    let row = ResponseRow {
        id: new_id(),
        session_id: new.session_id,
        question_id: new.question_id,
        student_answer: new.student_answer,
        is_correct: new.is_correct,
        response_time_seconds: new.response_time_seconds,
        timestamp: now_iso(),
        submitted_at_ms: new.submitted_at_ms,
        hints_used: new.hints_used,
        hint_records: new.hint_records,
        attempts: 1,
        initial_option: new.initial_option,
        final_option: new.final_option,
        option_change_count: new.option_change_count,
        option_change_history: new.option_change_history,
        navigation_frequency: new.navigation_frequency,
        navigation_pattern: new.navigation_pattern,
        time_spent_per_question: new.time_spent_per_question,
        inactivity_duration_ms: new.inactivity_duration_ms,
        question_index: new.question_index,
        hesitation_flags: new.hesitation_flags,
        knowledge_gaps: new.knowledge_gaps,
    };

    sqlx::query(
        r#"
        INSERT INTO "responses"
            ("id", "session_id", "question_id", "student_answer", "is_correct",
             "response_time_seconds", "timestamp", "submitted_at_ms",
             "hints_used", "hint_records", "attempts",
             "initial_option", "final_option", "option_change_count", "option_change_history",
             "navigation_frequency", "navigation_pattern", "time_spent_per_question",
             "inactivity_duration_ms", "question_index", "hesitation_flags", "knowledge_gaps")
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
        "#,
    )
    .bind(&row.id)
    .bind(&row.session_id)
    .bind(&row.question_id)
    .bind(&row.student_answer)
    .bind(row.is_correct as i64)
    .bind(row.response_time_seconds)
    .bind(&row.timestamp)
    .bind(row.submitted_at_ms)
    .bind(row.hints_used)
    .bind(to_json(&row.hint_records))
    .bind(row.attempts)
    .bind(&row.initial_option)
    .bind(&row.final_option)
    .bind(row.option_change_count)
    .bind(to_json(&row.option_change_history))
    .bind(row.navigation_frequency)
    .bind(&row.navigation_pattern)
    .bind(row.time_spent_per_question)
    .bind(row.inactivity_duration_ms)
    .bind(row.question_index)
    .bind(to_json(&row.hesitation_flags))
    .bind(to_json(&row.knowledge_gaps))
    .execute(pool)
    .await?;

    Ok(row)
}

/// Rewrites the mutable fields of an existing response in place. Used by
/// revisit submissions, which keep the original row id and timestamp.
pub async fn update(pool: &SqlitePool, row: &ResponseRow) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE "responses" SET
            "student_answer" = $1,
            "is_correct" = $2,
            "response_time_seconds" = $3,
            "submitted_at_ms" = $4,
            "hints_used" = $5,
            "hint_records" = $6,
            "attempts" = $7,
            "final_option" = $8,
            "option_change_count" = $9,
            "option_change_history" = $10,
            "navigation_frequency" = $11,
            "navigation_pattern" = $12,
            "time_spent_per_question" = $13,
            "inactivity_duration_ms" = $14,
            "hesitation_flags" = $15,
            "knowledge_gaps" = $16
        WHERE "id" = $17
        "#,
    )
    .bind(&row.student_answer)
    .bind(row.is_correct as i64)
    .bind(row.response_time_seconds)
    .bind(row.submitted_at_ms)
    .bind(row.hints_used)
    .bind(to_json(&row.hint_records))
    .bind(row.attempts)
    .bind(&row.final_option)
    .bind(row.option_change_count)
    .bind(to_json(&row.option_change_history))
    .bind(row.navigation_frequency)
    .bind(&row.navigation_pattern)
    .bind(row.time_spent_per_question)
    .bind(row.inactivity_duration_ms)
    .bind(to_json(&row.hesitation_flags))
    .bind(to_json(&row.knowledge_gaps))
    .bind(&row.id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_by_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Vec<ResponseRow>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT * FROM "responses" WHERE "session_id" = $1 ORDER BY "question_index" ASC, "submitted_at_ms" ASC"#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_response).collect())
}

/// The last `limit` answers in submission order, as engine samples.
pub async fn recent_samples(
    pool: &SqlitePool,
    session_id: &str,
    limit: usize,
) -> Result<Vec<ResponseSample>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "is_correct", "response_time_seconds", "hints_used", "submitted_at_ms"
        FROM "responses"
        WHERE "session_id" = $1
        ORDER BY "submitted_at_ms" DESC
        LIMIT $2
        "#,
    )
    .bind(session_id)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    let mut samples: Vec<ResponseSample> = rows
        .iter()
        .map(|row| ResponseSample {
            is_correct: row.get::<i64, _>("is_correct") != 0,
            response_time_seconds: row.get("response_time_seconds"),
            hints_used: row.get::<i64, _>("hints_used") as u32,
            timestamp_ms: row.get("submitted_at_ms"),
        })
        .collect();
    samples.reverse();
    Ok(samples)
}

/// (answered, correct) counts for the session.
pub async fn accuracy_counts(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<(i64, i64), sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS "total", COALESCE(SUM("is_correct"), 0) AS "correct"
        FROM "responses" WHERE "session_id" = $1
        "#,
    )
    .bind(session_id)
    .fetch_one(pool)
    .await?;
    Ok((row.get("total"), row.get("correct")))
}

/// Records a hint view against an already-answered question. Duplicate
/// timestamps are ignored so client retries do not inflate the count.
pub async fn append_hint(
    pool: &SqlitePool,
    session_id: &str,
    question_id: &str,
    hint: HintRecord,
) -> Result<Option<i64>, sqlx::Error> {
    let Some(mut row) = get_by_session_question(pool, session_id, question_id).await? else {
        return Ok(None);
    };

    if !row
        .hint_records
        .iter()
        .any(|h| h.timestamp_ms == hint.timestamp_ms)
    {
        row.hint_records.push(hint);
        row.hints_used = row.hint_records.len() as i64;
        sqlx::query(
            r#"UPDATE "responses" SET "hints_used" = $1, "hint_records" = $2 WHERE "id" = $3"#,
        )
        .bind(row.hints_used)
        .bind(to_json(&row.hint_records))
        .bind(&row.id)
        .execute(pool)
        .await?;
    }

    Ok(Some(row.hints_used))
}
