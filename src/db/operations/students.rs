use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::{new_id, now_iso};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    pub preferred_difficulty: f64,
    pub preferred_pacing: String,
    pub created_at: String,
    pub last_activity: Option<String>,
}

fn row_to_student(row: &sqlx::sqlite::SqliteRow) -> Student {
    Student {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        preferred_difficulty: row.get("preferred_difficulty"),
        preferred_pacing: row.get("preferred_pacing"),
        created_at: row.get("created_at"),
        last_activity: row.get("last_activity"),
    }
}

pub async fn create(
    pool: &SqlitePool,
    name: &str,
    email: &str,
) -> Result<Student, sqlx::Error> {
    let student = Student {
        id: new_id(),
        name: name.to_string(),
        email: email.to_string(),
        preferred_difficulty: 0.5,
        preferred_pacing: "medium".to_string(),
        created_at: now_iso(),
        last_activity: None,
    };

    sqlx::query(
        r#"
        INSERT INTO "students" ("id", "name", "email", "preferred_difficulty", "preferred_pacing", "created_at")
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&student.id)
    .bind(&student.name)
    .bind(&student.email)
    .bind(student.preferred_difficulty)
    .bind(&student.preferred_pacing)
    .bind(&student.created_at)
    .execute(pool)
    .await?;

    Ok(student)
}

pub async fn find_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<Student>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "students" WHERE "email" = $1 LIMIT 1"#)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_student))
}

pub async fn get(pool: &SqlitePool, student_id: &str) -> Result<Option<Student>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "students" WHERE "id" = $1 LIMIT 1"#)
        .bind(student_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_student))
}

pub async fn touch_last_activity(pool: &SqlitePool, student_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query(r#"UPDATE "students" SET "last_activity" = $1 WHERE "id" = $2"#)
        .bind(now_iso())
        .bind(student_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[tokio::test]
    async fn create_and_find_by_email() {
        let pool = memory_pool().await.unwrap();
        let created = create(&pool, "Ada", "ada@example.com").await.unwrap();
        assert_eq!(created.preferred_difficulty, 0.5);

        let found = find_by_email(&pool, "ada@example.com").await.unwrap();
        assert_eq!(found.unwrap().id, created.id);

        let missing = find_by_email(&pool, "nobody@example.com").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let pool = memory_pool().await.unwrap();
        create(&pool, "Ada", "ada@example.com").await.unwrap();
        let err = create(&pool, "Someone Else", "ada@example.com").await;
        assert!(err.is_err());
    }
}
