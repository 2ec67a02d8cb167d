//! Optional cross-encoder reranking of retrieval candidates.
//!
//! Scoring is trait-based so the pipeline crate can swap implementations
//! without caring whether reranking is compiled in: [`NullReranker`] is
//! always available and is a no-op; [`CrossEncoderReranker`] runs a local
//! ONNX cross-encoder behind the `rerank` feature. Batching and the
//! `RERANK_BATCH`/`RERANK_INPUT_CAP` candidate cap are the pipeline's
//! policy, not this crate's — a [`Reranker`] always scores whatever slice
//! it is handed.

#[cfg(feature = "rerank")]
pub mod cross_encoder;
mod error;
pub mod null;

pub use error::RerankError;
pub use null::NullReranker;

#[cfg(feature = "rerank")]
pub use cross_encoder::CrossEncoderReranker;

use citegraph_core::types::ChunkId;

/// Scores `(chunk_id, text)` candidates against `query`. Implementations
/// return one `(chunk_id, score)` pair per input candidate, in any order.
#[async_trait::async_trait]
pub trait Reranker: Send + Sync {
    async fn score(
        &self,
        query: &str,
        candidates: &[(ChunkId, String)],
    ) -> Result<Vec<(ChunkId, f32)>, RerankError>;
}

#[async_trait::async_trait]
impl<T: Reranker + ?Sized> Reranker for std::sync::Arc<T> {
    async fn score(
        &self,
        query: &str,
        candidates: &[(ChunkId, String)],
    ) -> Result<Vec<(ChunkId, f32)>, RerankError> {
        (**self).score(query, candidates).await
    }
}
