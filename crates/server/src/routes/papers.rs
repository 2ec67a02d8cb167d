//! Paper ingestion REST surface (spec.md §6 EXPANSION): already-extracted
//! text and metadata in, chunked/embedded/indexed paper out. Mirrors the
//! teacher's `routes/process.rs` (accept a document, run it through the
//! pipeline, report status) and `routes/index.rs::delete_document`
//! (cascade delete by id).

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use citegraph::types::{Paper, PaperId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct IngestPaperRequest {
    pub user_id: UserId,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub venue: Option<String>,
    /// Already-extracted full text; PDF upload and OCR stay out of scope
    /// (spec.md §1 Non-goals).
    pub full_text: String,
}

#[derive(Debug, Serialize)]
pub struct IngestPaperResponse {
    pub paper_id: PaperId,
    pub status: &'static str,
    pub chunk_count: usize,
}

pub async fn ingest_paper(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestPaperRequest>,
) -> ServerResult<impl IntoResponse> {
    if request.full_text.trim().is_empty() {
        return Err(ServerError::BadRequest("full_text must not be empty".into()));
    }

    let mut paper = Paper::new(request.user_id, request.title);
    paper.authors = request.authors;
    paper.year = request.year;
    paper.venue = request.venue;

    citegraph::ingest_paper(
        &mut paper,
        request.full_text,
        &state.store,
        state.embedder.as_ref(),
        &state.config,
    )
    .await?;

    let response = IngestPaperResponse {
        paper_id: paper.id,
        status: "indexed",
        chunk_count: paper.chunk_count,
    };
    state.papers.insert(paper);
    Ok(Json(response))
}

pub async fn get_paper(
    State(state): State<Arc<AppState>>,
    Path(paper_id): Path<PaperId>,
) -> ServerResult<impl IntoResponse> {
    let paper = state.papers.get(paper_id).ok_or(ServerError::NotFound)?;
    Ok(Json(paper))
}

pub async fn delete_paper(
    State(state): State<Arc<AppState>>,
    Path(paper_id): Path<PaperId>,
) -> ServerResult<impl IntoResponse> {
    if state.papers.remove(paper_id).is_none() {
        return Err(ServerError::NotFound);
    }
    citegraph::delete_paper(paper_id, &state.store).await?;
    Ok(Json(json!({ "paper_id": paper_id, "deleted": true })))
}
