pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod logstore;
pub mod response;
pub mod routes;
pub mod state;

use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Router over an already-initialized pool. Tests drive this directly
/// with an in-memory database.
pub fn build_app(pool: SqlitePool) -> axum::Router {
    let state = AppState::new(pool, AppState::create_registry());
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn create_app() -> Result<axum::Router, sqlx::Error> {
    let pool = db::init_pool_from_env().await?;
    Ok(build_app(pool))
}
