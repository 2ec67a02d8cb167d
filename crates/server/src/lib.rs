//! HTTP + WebSocket server for CiteGraph (spec.md §6 EXPANSION).
//!
//! Public surface:
//! - `GET /health`, `GET /ready`, `GET /metrics` — liveness/readiness/metrics
//! - `POST /api/v1/papers` — ingest already-extracted text + metadata
//! - `GET /api/v1/papers/:id`, `DELETE /api/v1/papers/:id`
//! - `GET /ws?user_id=...` — the streaming suggestion session
//!
//! [`start_server`] is the single entry point `main.rs` calls after loading
//! [`citegraph_core::EnvConfig`].

pub mod error;
pub mod middleware;
pub mod papers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ServerError, ServerResult};
pub use server::start_server;
pub use state::AppState;
