use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::{new_id, now_iso};
use crate::engine::config::EngagementThresholds;
use crate::engine::coordinator::WindowSummaryData;
use crate::engine::types::{EngagementLevel, FusedEngagement, Indicators};

/// One row of the per-response engagement trace: raw indicators plus the
/// fused result, snapshotted at submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementMetricRow {
    pub id: String,
    pub session_id: String,
    pub question_id: Option<String>,
    pub question_number: i64,
    pub timestamp: String,
    pub question_difficulty: Option<f64>,
    pub response_correctness: Option<bool>,
    pub response_time_seconds: Option<f64>,
    pub response_time_deviation: f64,
    pub inactivity_duration: f64,
    pub hint_usage_count: i64,
    pub rapid_guessing_probability: f64,
    pub accuracy_trend: f64,
    pub consistency_score: f64,
    pub cognitive_load: f64,
    pub frustration_probability: f64,
    pub confusion_probability: f64,
    pub boredom_probability: f64,
    pub engagement_score: f64,
    pub engagement_level: String,
    pub categorical_state: String,
    pub behavioral_score: f64,
    pub cognitive_score: f64,
    pub affective_score: f64,
    pub confidence: f64,
    pub primary_driver: String,
    pub secondary_driver: Option<String>,
    pub resulting_difficulty: Option<f64>,
}

pub struct MetricContext<'a> {
    pub session_id: &'a str,
    pub question_id: &'a str,
    pub question_number: i64,
    pub question_difficulty: f64,
    pub is_correct: bool,
    pub response_time_seconds: f64,
    pub resulting_difficulty: f64,
}

pub async fn record(
    pool: &SqlitePool,
    ctx: &MetricContext<'_>,
    indicators: &Indicators,
    fused: &FusedEngagement,
    thresholds: &EngagementThresholds,
) -> Result<(), sqlx::Error> {
    let level = EngagementLevel::from_score(
        fused.score,
        thresholds.low_engagement,
        thresholds.high_engagement,
    );

    sqlx::query(
        r#"
        INSERT INTO "engagement_metrics"
            ("id", "session_id", "question_id", "question_number", "timestamp",
             "question_difficulty", "response_correctness", "response_time_seconds",
             "response_time_deviation", "inactivity_duration", "hint_usage_count",
             "rapid_guessing_probability", "accuracy_trend", "consistency_score",
             "cognitive_load", "frustration_probability", "confusion_probability",
             "boredom_probability", "engagement_score", "engagement_level",
             "categorical_state", "behavioral_score", "cognitive_score",
             "affective_score", "confidence", "primary_driver", "secondary_driver",
             "resulting_difficulty")
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)
        "#,
    )
    .bind(new_id())
    .bind(ctx.session_id)
    .bind(ctx.question_id)
    .bind(ctx.question_number)
    .bind(now_iso())
    .bind(ctx.question_difficulty)
    .bind(ctx.is_correct as i64)
    .bind(ctx.response_time_seconds)
    .bind(indicators.response_time_deviation)
    .bind(indicators.inactivity_duration)
    .bind(indicators.hint_usage_count as i64)
    .bind(indicators.rapid_guessing_probability)
    .bind(indicators.accuracy_trend)
    .bind(indicators.consistency_score)
    .bind(indicators.inferred_cognitive_load)
    .bind(indicators.frustration_probability)
    .bind(indicators.confusion_probability)
    .bind(indicators.boredom_probability)
    .bind(fused.score)
    .bind(level.as_str())
    .bind(fused.categorical_state.as_str())
    .bind(fused.behavioral_score)
    .bind(fused.cognitive_score)
    .bind(fused.affective_score)
    .bind(fused.confidence)
    .bind(&fused.primary_driver)
    .bind(&fused.secondary_driver)
    .bind(ctx.resulting_difficulty)
    .execute(pool)
    .await?;
    Ok(())
}

fn row_to_metric(row: &sqlx::sqlite::SqliteRow) -> EngagementMetricRow {
    EngagementMetricRow {
        id: row.get("id"),
        session_id: row.get("session_id"),
        question_id: row.get("question_id"),
        question_number: row.get("question_number"),
        timestamp: row.get("timestamp"),
        question_difficulty: row.get("question_difficulty"),
        response_correctness: row
            .get::<Option<i64>, _>("response_correctness")
            .map(|v| v != 0),
        response_time_seconds: row.get("response_time_seconds"),
        response_time_deviation: row.get("response_time_deviation"),
        inactivity_duration: row.get("inactivity_duration"),
        hint_usage_count: row.get("hint_usage_count"),
        rapid_guessing_probability: row.get("rapid_guessing_probability"),
        accuracy_trend: row.get("accuracy_trend"),
        consistency_score: row.get("consistency_score"),
        cognitive_load: row.get("cognitive_load"),
        frustration_probability: row.get("frustration_probability"),
        confusion_probability: row.get("confusion_probability"),
        boredom_probability: row.get("boredom_probability"),
        engagement_score: row.get("engagement_score"),
        engagement_level: row.get("engagement_level"),
        categorical_state: row.get("categorical_state"),
        behavioral_score: row.get("behavioral_score"),
        cognitive_score: row.get("cognitive_score"),
        affective_score: row.get("affective_score"),
        confidence: row.get("confidence"),
        primary_driver: row.get("primary_driver"),
        secondary_driver: row.get("secondary_driver"),
        resulting_difficulty: row.get("resulting_difficulty"),
    }
}

pub async fn list_by_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Vec<EngagementMetricRow>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT * FROM "engagement_metrics" WHERE "session_id" = $1 ORDER BY "question_number" ASC"#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_metric).collect())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSummaryRow {
    pub id: String,
    pub session_id: String,
    pub window_number: i64,
    pub timestamp: String,
    pub window_size: i64,
    pub correct_count: i64,
    pub incorrect_count: i64,
    pub accuracy: f64,
    pub avg_response_time: f64,
    pub hints_used: i64,
    pub window_score: f64,
    pub avg_engagement_score: f64,
    pub avg_behavioral_score: f64,
    pub avg_cognitive_score: f64,
    pub avg_affective_score: f64,
    pub dominant_engagement_state: String,
    pub primary_driver_summary: String,
    pub difficulty_at_start: Option<f64>,
    pub difficulty_at_end: Option<f64>,
    pub total_difficulty_change: Option<f64>,
    pub decisions_count: i64,
    pub increase_count: i64,
    pub decrease_count: i64,
    pub maintain_count: i64,
}

pub async fn record_window_summary(
    pool: &SqlitePool,
    session_id: &str,
    summary: &WindowSummaryData,
) -> Result<(), sqlx::Error> {
    let metrics = &summary.score.metrics;
    let decisions =
        (summary.increase_count + summary.decrease_count + summary.maintain_count) as i64;

    sqlx::query(
        r#"
        INSERT INTO "window_summaries"
            ("id", "session_id", "window_number", "timestamp", "window_size",
             "correct_count", "incorrect_count", "accuracy", "avg_response_time",
             "hints_used", "window_score", "avg_engagement_score",
             "avg_behavioral_score", "avg_cognitive_score", "avg_affective_score",
             "dominant_engagement_state", "primary_driver_summary",
             "difficulty_at_start", "difficulty_at_end", "total_difficulty_change",
             "decisions_count", "increase_count", "decrease_count", "maintain_count")
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
        "#,
    )
    .bind(new_id())
    .bind(session_id)
    .bind(summary.window_number as i64)
    .bind(now_iso())
    .bind((metrics.correct_count + metrics.incorrect_count) as i64)
    .bind(metrics.correct_count as i64)
    .bind(metrics.incorrect_count as i64)
    .bind(metrics.accuracy)
    .bind(metrics.avg_response_time)
    .bind(metrics.hints_used as i64)
    .bind(summary.score.score)
    .bind(summary.avg_engagement_score)
    .bind(summary.avg_behavioral_score)
    .bind(summary.avg_cognitive_score)
    .bind(summary.avg_affective_score)
    .bind(summary.dominant_state.as_str())
    .bind(&summary.primary_driver_summary)
    .bind(summary.difficulty_at_start)
    .bind(summary.difficulty_at_end)
    .bind(summary.difficulty_at_end - summary.difficulty_at_start)
    .bind(decisions)
    .bind(summary.increase_count as i64)
    .bind(summary.decrease_count as i64)
    .bind(summary.maintain_count as i64)
    .execute(pool)
    .await?;
    Ok(())
}

fn row_to_window(row: &sqlx::sqlite::SqliteRow) -> WindowSummaryRow {
    WindowSummaryRow {
        id: row.get("id"),
        session_id: row.get("session_id"),
        window_number: row.get("window_number"),
        timestamp: row.get("timestamp"),
        window_size: row.get("window_size"),
        correct_count: row.get("correct_count"),
        incorrect_count: row.get("incorrect_count"),
        accuracy: row.get("accuracy"),
        avg_response_time: row.get("avg_response_time"),
        hints_used: row.get("hints_used"),
        window_score: row.get("window_score"),
        avg_engagement_score: row.get("avg_engagement_score"),
        avg_behavioral_score: row.get("avg_behavioral_score"),
        avg_cognitive_score: row.get("avg_cognitive_score"),
        avg_affective_score: row.get("avg_affective_score"),
        dominant_engagement_state: row.get("dominant_engagement_state"),
        primary_driver_summary: row.get("primary_driver_summary"),
        difficulty_at_start: row.get("difficulty_at_start"),
        difficulty_at_end: row.get("difficulty_at_end"),
        total_difficulty_change: row.get("total_difficulty_change"),
        decisions_count: row.get("decisions_count"),
        increase_count: row.get("increase_count"),
        decrease_count: row.get("decrease_count"),
        maintain_count: row.get("maintain_count"),
    }
}

pub async fn list_windows_by_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Vec<WindowSummaryRow>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT * FROM "window_summaries" WHERE "session_id" = $1 ORDER BY "window_number" ASC"#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_window).collect())
}
