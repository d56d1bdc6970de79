use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::new_id;
use crate::engine::selector::CandidateQuestion;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub subject: String,
    pub topic: String,
    pub difficulty: f64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: String,
    pub explanation: String,
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuestion {
    pub subject: String,
    #[serde(default)]
    pub topic: String,
    pub difficulty: f64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub hints: Vec<String>,
}

fn row_to_question(row: &sqlx::sqlite::SqliteRow) -> Question {
    let hints_json: String = row.get("hints");
    Question {
        id: row.get("id"),
        subject: row.get("subject"),
        topic: row.get("topic"),
        difficulty: row.get("difficulty"),
        question_text: row.get("question_text"),
        option_a: row.get("option_a"),
        option_b: row.get("option_b"),
        option_c: row.get("option_c"),
        option_d: row.get("option_d"),
        correct_option: row.get("correct_option"),
        explanation: row.get("explanation"),
        hints: serde_json::from_str(&hints_json).unwrap_or_default(),
    }
}

pub async fn insert(pool: &SqlitePool, new: &NewQuestion) -> Result<Question, sqlx::Error> {
    let id = new_id();
    let hints_json = serde_json::to_string(&new.hints).unwrap_or_else(|_| "[]".to_string());

    sqlx::query(
        r#"
        INSERT INTO "questions"
            ("id", "subject", "topic", "difficulty", "question_text",
             "option_a", "option_b", "option_c", "option_d",
             "correct_option", "explanation", "hints")
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(&id)
    .bind(&new.subject)
    .bind(&new.topic)
    .bind(new.difficulty)
    .bind(&new.question_text)
    .bind(&new.option_a)
    .bind(&new.option_b)
    .bind(&new.option_c)
    .bind(&new.option_d)
    .bind(&new.correct_option)
    .bind(&new.explanation)
    .bind(&hints_json)
    .execute(pool)
    .await?;

    Ok(Question {
        id,
        subject: new.subject.clone(),
        topic: new.topic.clone(),
        difficulty: new.difficulty,
        question_text: new.question_text.clone(),
        option_a: new.option_a.clone(),
        option_b: new.option_b.clone(),
        option_c: new.option_c.clone(),
        option_d: new.option_d.clone(),
        correct_option: new.correct_option.clone(),
        explanation: new.explanation.clone(),
        hints: new.hints.clone(),
    })
}

pub async fn get(pool: &SqlitePool, question_id: &str) -> Result<Option<Question>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "questions" WHERE "id" = $1 LIMIT 1"#)
        .bind(question_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_question))
}

pub async fn count_in_subject(pool: &SqlitePool, subject: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM "questions" WHERE "subject" = $1"#)
        .bind(subject)
        .fetch_one(pool)
        .await
}

/// Questions in the subject the session has not answered yet, as
/// lightweight (id, difficulty) pairs for the selector.
pub async fn unanswered_candidates(
    pool: &SqlitePool,
    session_id: &str,
    subject: &str,
) -> Result<Vec<CandidateQuestion>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "id", "difficulty" FROM "questions"
        WHERE "subject" = $1
          AND "id" NOT IN (SELECT "question_id" FROM "responses" WHERE "session_id" = $2)
        "#,
    )
    .bind(subject)
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| CandidateQuestion {
            id: row.get("id"),
            difficulty: row.get("difficulty"),
        })
        .collect())
}
