use thiserror::Error;

/// Failure modes of the vector and lexical indices and their durable store.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("lexical fit timed out after {0:?}")]
    LexicalFitTimeout(std::time::Duration),

    #[error("paper {0} not found")]
    PaperNotFound(citegraph_core::types::PaperId),
}

impl IndexError {
    pub fn backend(msg: impl Into<String>) -> Self {
        IndexError::Backend(msg.into())
    }
}
