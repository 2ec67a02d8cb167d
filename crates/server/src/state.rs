//! Shared application state (spec.md §4, §6), mirroring the teacher's
//! `crates/server/src/state.rs` — one `Arc<AppState>` cloned into every
//! handler and into each session actor it spawns.

use crate::error::ServerResult;
use crate::papers::PapersTable;
use citegraph_core::EnvConfig;
use citegraph_embedder::{build_embedder, Embedder, EmbedderConfig, EmbedderMode};
use citegraph_index::{AnnConfig, Store};
use citegraph_pipeline::context::PaperProvider;
use citegraph_reranker::{NullReranker, Reranker};
use std::sync::Arc;

pub struct AppState {
    pub config: Arc<EnvConfig>,
    pub store: Arc<Store>,
    pub embedder: Arc<dyn Embedder>,
    pub reranker: Arc<dyn Reranker>,
    pub papers: Arc<PapersTable>,
}

impl AppState {
    pub fn new(config: EnvConfig) -> ServerResult<Self> {
        let embedder_cfg = EmbedderConfig {
            model_path: config.embedding_model_path.clone(),
            cache_capacity: config.embedding_cache_capacity,
            mode: default_embedder_mode(),
            ..Default::default()
        };
        let dimension = embedder_cfg.dimension;
        let embedder: Arc<dyn Embedder> = Arc::new(build_embedder(embedder_cfg)?);

        let reranker: Arc<dyn Reranker> = build_reranker(&config)?;

        let db_path = std::path::Path::new(&config.data_dir).join("chunks.redb");
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| crate::error::ServerError::Internal(format!("data_dir: {e}")))?;
        let ann_config = AnnConfig {
            min_vectors_for_ann: config.min_vectors_for_ann,
            ..Default::default()
        };
        let store = Arc::new(Store::open(db_path, dimension, ann_config)?);

        Ok(Self {
            config: Arc::new(config),
            store,
            embedder,
            reranker,
            papers: Arc::new(PapersTable::new()),
        })
    }

    pub fn paper_provider(&self) -> Arc<dyn PaperProvider> {
        self.papers.clone()
    }
}

#[cfg(feature = "onnx")]
fn default_embedder_mode() -> EmbedderMode {
    EmbedderMode::Onnx
}

#[cfg(not(feature = "onnx"))]
fn default_embedder_mode() -> EmbedderMode {
    EmbedderMode::Stub
}

#[cfg(feature = "rerank")]
fn build_reranker(config: &EnvConfig) -> ServerResult<Arc<dyn Reranker>> {
    if !config.enable_reranking {
        return Ok(Arc::new(NullReranker));
    }
    let reranker = citegraph_reranker::CrossEncoderReranker::load(
        &config.rerank_model_path,
        &config.rerank_tokenizer_path,
        config.rerank_max_sequence_len,
    )
    .map_err(|e| crate::error::ServerError::Internal(e.to_string()))?;
    Ok(Arc::new(reranker))
}

#[cfg(not(feature = "rerank"))]
fn build_reranker(_config: &EnvConfig) -> ServerResult<Arc<dyn Reranker>> {
    Ok(Arc::new(NullReranker))
}

impl From<citegraph_embedder::EmbedError> for crate::error::ServerError {
    fn from(err: citegraph_embedder::EmbedError) -> Self {
        crate::error::ServerError::Internal(err.to_string())
    }
}
