//! Liveness, readiness and metrics endpoints (spec.md §6 EXPANSION),
//! mirroring the teacher's `crates/server/src/routes/health.rs`.

use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use std::time::SystemTime;

static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

fn uptime_seconds() -> u64 {
    SERVER_START_TIME.elapsed().map(|d| d.as_secs()).unwrap_or(0)
}

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "citegraph-server",
        "uptime_seconds": uptime_seconds(),
    }))
}

/// Ready once the vector/lexical indices have been rebuilt from disk, which
/// happens synchronously in [`crate::state::AppState::new`] — by the time
/// this handler is reachable the store is always ready.
pub async fn readiness_check(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ready",
        "components": {
            "store": "ready",
        },
        "uptime_seconds": uptime_seconds(),
    }))
}

pub async fn metrics() -> impl IntoResponse {
    Json(json!({
        "uptime_seconds": uptime_seconds(),
    }))
}
