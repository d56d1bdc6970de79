use std::net::SocketAddr;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use tutor_backend_rust::config::Config;
use tutor_backend_rust::logging::init_tracing;
use tutor_backend_rust::routes;
use tutor_backend_rust::state::AppState;
use tutor_backend_rust::{db, engine::EngineConfig};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    let _log_guard = init_tracing(&config.log_level);

    let pool = match db::init_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(error = %err, url = %config.database_url, "database initialization failed");
            std::process::exit(1);
        }
    };

    let engine_config = EngineConfig::from_env();
    tracing::info!(
        min_difficulty = engine_config.adaptation.min_difficulty,
        max_difficulty = engine_config.adaptation.max_difficulty,
        window_size = engine_config.window_size,
        facial_enabled = engine_config.facial.enabled,
        "adaptation engine configured"
    );

    let state = AppState::new(
        pool,
        std::sync::Arc::new(tutor_backend_rust::engine::CoordinatorRegistry::new(
            engine_config,
        )),
    );

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr();
    tracing::info!(%addr, "tutor-backend-rust listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "failed to bind listener");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("HTTP server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
