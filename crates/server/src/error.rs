//! Aggregated HTTP error type (spec.md §7), mirroring the teacher's
//! `crates/server/src/error.rs`: one `#[from]` variant per sub-crate error,
//! a status-code mapping, and a JSON `{"error": {"code", "message"}}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("paper not found")]
    NotFound,

    #[error("ingestion failed: {0}")]
    Pipeline(#[from] citegraph::PipelineError),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] citegraph_pipeline::RetrievalError),

    #[error("storage error: {0}")]
    Index(#[from] citegraph_index::IndexError),

    #[error("configuration error: {0}")]
    Config(#[from] citegraph_core::ConfigError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Pipeline(_) | ServerError::Index(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Retrieval(err) => match err {
                citegraph_pipeline::RetrievalError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                citegraph_pipeline::RetrievalError::Timeout => StatusCode::REQUEST_TIMEOUT,
                _ => StatusCode::SERVICE_UNAVAILABLE,
            },
            ServerError::Config(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "bad_request",
            ServerError::NotFound => "not_found",
            ServerError::Pipeline(_) => "pipeline_error",
            ServerError::Retrieval(err) => err.code(),
            ServerError::Index(_) => "index_error",
            ServerError::Config(_) => "config_error",
            ServerError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();
        (status, Json(json!({ "error": { "code": code, "message": message } }))).into_response()
    }
}
