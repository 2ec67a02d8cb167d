use thiserror::Error;

/// Failure modes of [`crate::chunk_paper`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("paper has no extractable sentences")]
    EmptyInput,
}
