//! Integration tests for the HTTP/WebSocket server crate's application
//! state and route DTOs, following the teacher's
//! `tests/server_api_integration.rs` pattern of exercising `AppState` and
//! the route types directly rather than binding a real socket.

use citegraph_core::types::{Paper, UserId};
use citegraph_core::EnvConfig;
use citegraph_embedder::Embedder as _;
use citegraph_server::error::ServerError;
use citegraph_server::papers::PapersTable;
use citegraph_server::state::AppState;

fn test_config(data_dir: &std::path::Path) -> EnvConfig {
    EnvConfig {
        data_dir: data_dir.to_string_lossy().into_owned(),
        ..EnvConfig::default()
    }
}

#[tokio::test]
async fn state_initialization_opens_a_store_and_wires_a_null_reranker_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(dir.path())).expect("AppState::new should succeed");

    assert_eq!(state.embedder.dimension(), 384);
    assert_eq!(state.config.bind_addr, "0.0.0.0");
}

#[tokio::test]
async fn ingested_paper_metadata_is_retrievable_through_the_papers_table() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(dir.path())).expect("AppState::new should succeed");

    let owner = UserId(uuid::Uuid::new_v4());
    let paper = Paper::new(owner, "Attention Is All You Need");
    let id = paper.id;
    state.papers.insert(paper);

    let fetched = state.papers.get(id).expect("paper should be present");
    assert_eq!(fetched.title, "Attention Is All You Need");
    assert_eq!(fetched.owner_id, owner);

    let listed = state.papers.list_for_owner(owner);
    assert_eq!(listed.len(), 1);

    let removed = state.papers.remove(id);
    assert!(removed.is_some());
    assert!(state.papers.get(id).is_none());
}

#[test]
fn papers_table_default_is_empty() {
    let table = PapersTable::new();
    let owner = UserId(uuid::Uuid::new_v4());
    assert!(table.list_for_owner(owner).is_empty());
}

#[test]
fn not_found_maps_to_http_404_with_a_stable_error_code() {
    let err = ServerError::NotFound;
    assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    assert_eq!(err.error_code(), "not_found");
}

#[test]
fn bad_request_maps_to_http_400() {
    let err = ServerError::BadRequest("empty full_text".into());
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(err.error_code(), "bad_request");
}

#[test]
fn rate_limited_retrieval_maps_to_http_429() {
    let err = ServerError::Retrieval(citegraph_pipeline::RetrievalError::RateLimited);
    assert_eq!(err.status_code(), axum::http::StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(err.error_code(), "rate_limited");
}
