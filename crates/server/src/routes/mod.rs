//! HTTP and WebSocket route handlers, organized by concern the way the
//! teacher's `crates/server/src/routes/` is:
//!
//! - `health`: liveness, readiness, metrics
//! - `papers`: ingestion REST surface
//! - `ws`: the streaming suggestion session

pub mod health;
pub mod papers;
pub mod ws;

use crate::error::ServerError;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

pub async fn api_info() -> impl IntoResponse {
    Json(json!({
        "name": "citegraph-server",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/health",
            "/ready",
            "/metrics",
            "/api/v1/papers",
            "/api/v1/papers/:id",
            "/ws",
        ],
    }))
}

pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
