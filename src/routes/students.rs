use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::db::operations::students;
use crate::response::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// Create-or-login keyed by email. An existing email with a different
/// name is rejected so one address cannot be shared across students.
pub async fn create_or_login(
    State(state): State<AppState>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<Response, AppError> {
    let email = payload.email.trim().to_string();
    let name = payload.name.trim().to_string();
    if email.is_empty() || name.is_empty() {
        return Err(AppError::validation("Email and name are required"));
    }

    if let Some(existing) = students::find_by_email(state.pool(), &email).await? {
        if !existing.name.eq_ignore_ascii_case(&name) {
            return Err(AppError::forbidden(format!(
                "Email already registered with name \"{}\". Please use the correct name to login.",
                existing.name
            )));
        }
        tracing::info!(student_id = %existing.id, "student login");
        return Ok(Json(json!({
            "success": true,
            "student": existing,
            "message": "Login successful",
        }))
        .into_response());
    }

    let student = students::create(state.pool(), &name, &email).await?;
    tracing::info!(student_id = %student.id, "student created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "student": student,
            "message": "Account created successfully",
        })),
    )
        .into_response())
}

pub async fn get_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Response, AppError> {
    let student = students::get(state.pool(), &student_id)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))?;
    Ok(Json(json!({ "success": true, "student": student })).into_response())
}
