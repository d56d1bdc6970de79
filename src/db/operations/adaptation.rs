use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::{new_id, now_iso};
use crate::engine::types::AdaptiveDecision;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationLogRow {
    pub id: String,
    pub session_id: String,
    pub student_id: String,
    pub question_number: i64,
    pub timestamp: String,
    pub trigger_metric: String,
    pub trigger_value: f64,
    pub adaptation_type: String,
    pub old_value: f64,
    pub new_value: f64,
    pub reason: String,
    pub primary_action: String,
    pub secondary_actions: Vec<String>,
    pub difficulty_delta: f64,
    pub engagement_influenced: bool,
    pub was_effective: Option<bool>,
}

pub struct LogContext<'a> {
    pub session_id: &'a str,
    pub student_id: &'a str,
    pub question_number: i64,
    pub trigger_metric: &'a str,
    pub trigger_value: f64,
    pub old_difficulty: f64,
}

pub async fn record(
    pool: &SqlitePool,
    ctx: &LogContext<'_>,
    decision: &AdaptiveDecision,
) -> Result<(), sqlx::Error> {
    let secondary: Vec<&str> = decision
        .secondary_actions
        .iter()
        .map(|a| a.as_str())
        .collect();

    sqlx::query(
        r#"
        INSERT INTO "adaptation_logs"
            ("id", "session_id", "student_id", "question_number", "timestamp",
             "trigger_metric", "trigger_value", "adaptation_type",
             "old_value", "new_value", "reason", "primary_action",
             "secondary_actions", "difficulty_delta", "engagement_influenced")
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'difficulty', $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(new_id())
    .bind(ctx.session_id)
    .bind(ctx.student_id)
    .bind(ctx.question_number)
    .bind(now_iso())
    .bind(ctx.trigger_metric)
    .bind(ctx.trigger_value)
    .bind(ctx.old_difficulty)
    .bind(decision.new_difficulty)
    .bind(&decision.rationale)
    .bind(decision.primary_action.as_str())
    .bind(serde_json::to_string(&secondary).unwrap_or_else(|_| "[]".to_string()))
    .bind(decision.difficulty_delta)
    .bind(decision.engagement_influenced as i64)
    .execute(pool)
    .await?;
    Ok(())
}

/// Marks whether a past adjustment paid off, judged by the window score
/// that followed it.
pub async fn mark_effectiveness(
    pool: &SqlitePool,
    log_id: &str,
    was_effective: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(r#"UPDATE "adaptation_logs" SET "was_effective" = $1 WHERE "id" = $2"#)
        .bind(was_effective as i64)
        .bind(log_id)
        .execute(pool)
        .await?;
    Ok(())
}

fn row_to_log(row: &sqlx::sqlite::SqliteRow) -> AdaptationLogRow {
    let secondary_json: String = row.get("secondary_actions");
    AdaptationLogRow {
        id: row.get("id"),
        session_id: row.get("session_id"),
        student_id: row.get("student_id"),
        question_number: row.get("question_number"),
        timestamp: row.get("timestamp"),
        trigger_metric: row.get("trigger_metric"),
        trigger_value: row.get("trigger_value"),
        adaptation_type: row.get("adaptation_type"),
        old_value: row.get("old_value"),
        new_value: row.get("new_value"),
        reason: row.get("reason"),
        primary_action: row.get("primary_action"),
        secondary_actions: serde_json::from_str(&secondary_json).unwrap_or_default(),
        difficulty_delta: row.get("difficulty_delta"),
        engagement_influenced: row.get::<i64, _>("engagement_influenced") != 0,
        was_effective: row.get::<Option<i64>, _>("was_effective").map(|v| v != 0),
    }
}

pub async fn list_by_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Vec<AdaptationLogRow>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT * FROM "adaptation_logs" WHERE "session_id" = $1 ORDER BY "question_number" ASC"#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_log).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::db::operations::{sessions, students};
    use crate::engine::types::TutoringAction;
    use chrono::Utc;

    #[tokio::test]
    async fn record_and_list_roundtrip() {
        let pool = memory_pool().await.unwrap();
        let student = students::create(&pool, "Ada", "a@x.com").await.unwrap();
        let session = sessions::create(&pool, &student.id, "math", 10, 0.5, "window")
            .await
            .unwrap();

        let decision = AdaptiveDecision {
            primary_action: TutoringAction::IncreaseDifficulty,
            secondary_actions: vec![TutoringAction::GiveMotivationalFeedback],
            difficulty_delta: 0.05,
            new_difficulty: 0.55,
            rationale: "Increase difficulty (+0.050). Strong performance".to_string(),
            engagement_influenced: false,
            timestamp: Utc::now(),
        };
        record(
            &pool,
            &LogContext {
                session_id: &session.id,
                student_id: &student.id,
                question_number: 5,
                trigger_metric: "window_score",
                trigger_value: 0.87,
                old_difficulty: 0.5,
            },
            &decision,
        )
        .await
        .unwrap();

        let logs = list_by_session(&pool, &session.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        let log = &logs[0];
        assert_eq!(log.primary_action, "increase_difficulty");
        assert_eq!(log.secondary_actions, vec!["give_motivational_feedback"]);
        assert!((log.new_value - 0.55).abs() < 1e-9);
        assert!(log.was_effective.is_none());

        mark_effectiveness(&pool, &log.id, true).await.unwrap();
        let logs = list_by_session(&pool, &session.id).await.unwrap();
        assert_eq!(logs[0].was_effective, Some(true));
    }
}
