use thiserror::Error;

/// Failure modes across every [`crate::Embedder`] backend.
#[derive(Debug, Error, Clone)]
pub enum EmbedError {
    #[error("embedding model not found at {0}")]
    ModelNotFound(String),

    #[error("tokenizer missing at {0}")]
    TokenizerMissing(String),

    #[error("invalid embedder configuration: {0}")]
    InvalidConfig(String),

    #[error("remote embedding circuit open for {provider}")]
    CircuitOpen { provider: String },

    #[error("remote embedding request failed: {0}")]
    Remote(String),

    #[error("local inference failed: {0}")]
    Inference(String),

    #[error("embedding request timed out")]
    Timeout,
}
