//! Router assembly and process lifecycle, mirroring the teacher's
//! `crates/server/src/server.rs`: build the router, bind, serve with
//! graceful shutdown on Ctrl+C/SIGTERM.

use crate::routes::{api_info, health, not_found, papers, ws};
use crate::state::AppState;
use axum::middleware::from_fn;
use axum::routing::{delete, get, post};
use axum::Router;
use citegraph_core::EnvConfig;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route("/api/v1/papers", post(papers::ingest_paper))
        .route("/api/v1/papers/{id}", get(papers::get_paper))
        .route("/api/v1/papers/{id}", delete(papers::delete_paper))
        .route("/ws", get(ws::ws_handler))
        .fallback(not_found)
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.retrieval_timeout_secs.max(30),
        )))
        .layer(from_fn(crate::middleware::log_requests))
        .layer(from_fn(crate::middleware::request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the server: JSON structured logging, state construction, router
/// build, bind, serve-until-shutdown.
pub async fn start_server(config: EnvConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .json()
        .init();

    let socket_addr = config.socket_addr();
    let state = Arc::new(AppState::new(config)?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&socket_addr).await?;
    tracing::info!(addr = %socket_addr, "server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server_shutdown_complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received_ctrl_c"),
        _ = terminate => tracing::info!("received_sigterm"),
    }
}
