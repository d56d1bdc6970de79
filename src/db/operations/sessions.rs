use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::{new_id, now_iso};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub student_id: String,
    pub subject: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub status: String,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub score_percentage: f64,
    pub current_difficulty: f64,
    pub cadence: String,
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Session {
    Session {
        id: row.get("id"),
        student_id: row.get("student_id"),
        subject: row.get("subject"),
        started_at: row.get("started_at"),
        ended_at: row.get("ended_at"),
        status: row.get("status"),
        total_questions: row.get("total_questions"),
        correct_answers: row.get("correct_answers"),
        score_percentage: row.get("score_percentage"),
        current_difficulty: row.get("current_difficulty"),
        cadence: row.get("cadence"),
    }
}

pub async fn create(
    pool: &SqlitePool,
    student_id: &str,
    subject: &str,
    total_questions: i64,
    initial_difficulty: f64,
    cadence: &str,
) -> Result<Session, sqlx::Error> {
    let session = Session {
        id: new_id(),
        student_id: student_id.to_string(),
        subject: subject.to_string(),
        started_at: now_iso(),
        ended_at: None,
        status: "active".to_string(),
        total_questions,
        correct_answers: 0,
        score_percentage: 0.0,
        current_difficulty: initial_difficulty,
        cadence: cadence.to_string(),
    };

    sqlx::query(
        r#"
        INSERT INTO "sessions"
            ("id", "student_id", "subject", "started_at", "status",
             "total_questions", "current_difficulty", "cadence")
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(&session.id)
    .bind(&session.student_id)
    .bind(&session.subject)
    .bind(&session.started_at)
    .bind(&session.status)
    .bind(session.total_questions)
    .bind(session.current_difficulty)
    .bind(&session.cadence)
    .execute(pool)
    .await?;

    Ok(session)
}

pub async fn get(pool: &SqlitePool, session_id: &str) -> Result<Option<Session>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "sessions" WHERE "id" = $1 LIMIT 1"#)
        .bind(session_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_session))
}

pub async fn list_by_student(
    pool: &SqlitePool,
    student_id: &str,
) -> Result<Vec<Session>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT * FROM "sessions" WHERE "student_id" = $1 ORDER BY "started_at" ASC"#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_session).collect())
}

/// Stores the correct-answer count and recomputes the percentage score
/// against the session's question target.
pub async fn update_score(
    pool: &SqlitePool,
    session_id: &str,
    correct_answers: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE "sessions"
        SET "correct_answers" = $1,
            "score_percentage" = CASE WHEN "total_questions" > 0
                THEN $1 * 100.0 / "total_questions" ELSE 0.0 END
        WHERE "id" = $2
        "#,
    )
    .bind(correct_answers)
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_difficulty(
    pool: &SqlitePool,
    session_id: &str,
    difficulty: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(r#"UPDATE "sessions" SET "current_difficulty" = $1 WHERE "id" = $2"#)
        .bind(difficulty)
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_status(
    pool: &SqlitePool,
    session_id: &str,
    status: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(r#"UPDATE "sessions" SET "status" = $1 WHERE "id" = $2"#)
        .bind(status)
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn end(pool: &SqlitePool, session_id: &str, status: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE "sessions" SET "status" = $1, "ended_at" = $2 WHERE "id" = $3"#,
    )
    .bind(status)
    .bind(now_iso())
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Distinct questions the session has answered. Revisits update the
/// existing row, so a plain row count is already the unique count.
pub async fn unique_answered_count(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM "responses" WHERE "session_id" = $1"#)
        .bind(session_id)
        .fetch_one(pool)
        .await
}
