//! Cross-cutting request middleware, mirroring the teacher's
//! `crates/server/src/middleware.rs` (request-id stamping, request
//! logging) minus API-key auth — this spec has no auth layer (spec.md §1
//! Non-goals).

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

pub async fn request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(request_id.clone());
    let mut response = next.run(request).await;
    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request.extensions().get::<String>().cloned().unwrap_or_default();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        request_id = %request_id,
        "request_completed"
    );
    response
}
