use thiserror::Error;

/// Failure modes of a [`crate::Reranker`] implementation.
#[derive(Debug, Error)]
pub enum RerankError {
    #[error("reranker model not found at {0}")]
    ModelNotFound(String),

    #[error("reranker tokenizer not found at {0}")]
    TokenizerMissing(String),

    #[error("cross-encoder inference failed: {0}")]
    Inference(String),
}
