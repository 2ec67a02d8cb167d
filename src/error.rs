//! Root-level error type aggregating failures from every pipeline stage.

use thiserror::Error;

/// Failure of the paper ingestion or retrieval pipeline.
///
/// Mirrors the teacher's `PipelineError`: one variant per stage, each
/// wrapping that stage's own error type so callers can match on cause
/// without losing detail.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[cfg(feature = "embedded")]
    #[error("chunking failed: {0}")]
    Chunking(#[from] citegraph_chunker::ChunkError),

    #[cfg(feature = "embedded")]
    #[error("embedding failed: {0}")]
    Embedding(#[from] citegraph_embedder::EmbedError),

    #[cfg(feature = "embedded")]
    #[error("index operation failed: {0}")]
    Index(#[from] citegraph_index::IndexError),

    #[cfg(feature = "embedded")]
    #[error("reranking failed: {0}")]
    Rerank(#[from] citegraph_reranker::RerankError),

    #[error("paper has no extractable content")]
    NoContent,

    #[error("paper {0} not found")]
    PaperNotFound(crate::types::PaperId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<citegraph_core::ConfigError> for PipelineError {
    fn from(err: citegraph_core::ConfigError) -> Self {
        match err {
            citegraph_core::ConfigError::Config(msg) => PipelineError::Config(msg),
        }
    }
}

impl PipelineError {
    /// Maps a pipeline failure to the `FailureReason` recorded on the paper
    /// (spec.md §7) — `None` for errors that never reach a persisted paper.
    pub fn failure_reason(&self) -> Option<crate::types::FailureReason> {
        use crate::types::FailureReason;
        match self {
            PipelineError::NoContent => Some(FailureReason::NoContent),
            #[cfg(feature = "embedded")]
            PipelineError::Embedding(_) => Some(FailureReason::EmbeddingFailed),
            #[cfg(feature = "embedded")]
            PipelineError::Index(_) => Some(FailureReason::IndexWriteFailed),
            PipelineError::Storage(_) => Some(FailureReason::IndexWriteFailed),
            _ => None,
        }
    }
}
