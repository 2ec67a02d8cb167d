use thiserror::Error;

/// Failure of one `suggest` call (spec.md §7). Soft degradations — a timed
/// out branch, a skipped rerank — are not errors; they are recorded in
/// [`crate::Diagnostics`] alongside a (possibly reduced) result set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("rate limited")]
    RateLimited,

    #[error("embedding unavailable")]
    EmbeddingUnavailable,

    #[error("retrieval timed out before any ranking was producible")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(String),
}

impl RetrievalError {
    /// The outbound `error.code` string (spec.md §6).
    pub fn code(&self) -> &'static str {
        match self {
            RetrievalError::RateLimited => "rate_limited",
            RetrievalError::EmbeddingUnavailable => "embedding_unavailable",
            RetrievalError::Timeout => "timeout",
            RetrievalError::Internal(_) => "internal",
        }
    }
}
