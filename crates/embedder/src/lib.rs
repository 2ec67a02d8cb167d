//! Embedding backends for CiteGraph: a `Stub` (deterministic, always
//! available), a local `Onnx` backend, and a `Remote` HTTP backend used only
//! during ingestion.
//!
//! ```
//! use citegraph_embedder::{Embedder, StubEmbedder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let embedder = StubEmbedder::new(128);
//!     let vectors = embedder.embed(&["graph neural networks"]).await.unwrap();
//!     assert_eq!(vectors[0].len(), 128);
//! }
//! ```

pub mod cache;
pub mod circuit_breaker;
pub mod config;
mod error;
pub mod remote;
pub(crate) mod serde_millis;
pub mod stub;

#[cfg(feature = "onnx")]
pub mod onnx;

pub mod retry;

pub use cache::CachedEmbedder;
pub use config::{EmbedderConfig, EmbedderMode};
pub use error::EmbedError;
pub use remote::RemoteEmbedder;
pub use stub::StubEmbedder;

use async_trait::async_trait;

/// Common interface every embedding backend implements.
///
/// `embed` is batched and deterministic for a fixed backend/config: the
/// same input text always yields the same vector, and vectors are unit L2
/// norm when `normalize` is enabled (spec.md §4.2).
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError>;
    fn dimension(&self) -> usize;
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for std::sync::Arc<T> {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        (**self).embed(texts).await
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }
}

/// Builds the configured backend, wrapped in the shared LRU cache.
///
/// `Onnx` requires the `onnx` feature; without it, configuring
/// [`EmbedderMode::Onnx`] returns [`EmbedError::InvalidConfig`] rather than
/// silently falling back, since a silent fallback to `Stub` in production
/// would be a correctness regression worth failing loudly on.
pub fn build_embedder(cfg: EmbedderConfig) -> Result<CachedEmbedder<BackendHandle>, EmbedError> {
    let capacity = cfg.cache_capacity;
    let backend = BackendHandle::build(cfg)?;
    Ok(CachedEmbedder::new(backend, capacity))
}

/// Owned handle to whichever concrete backend was configured.
pub enum BackendHandle {
    Stub(StubEmbedder),
    Remote(RemoteEmbedder),
    #[cfg(feature = "onnx")]
    Onnx(onnx::OnnxEmbedder),
}

impl BackendHandle {
    fn build(cfg: EmbedderConfig) -> Result<Self, EmbedError> {
        match cfg.mode {
            EmbedderMode::Stub => Ok(BackendHandle::Stub(StubEmbedder::new(cfg.dimension))),
            EmbedderMode::Remote => Ok(BackendHandle::Remote(RemoteEmbedder::new(cfg)?)),
            #[cfg(feature = "onnx")]
            EmbedderMode::Onnx => Ok(BackendHandle::Onnx(onnx::OnnxEmbedder::load(cfg)?)),
            #[cfg(not(feature = "onnx"))]
            EmbedderMode::Onnx => Err(EmbedError::InvalidConfig(
                "onnx backend requested but the `onnx` feature is disabled".into(),
            )),
        }
    }
}

#[async_trait]
impl Embedder for BackendHandle {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        match self {
            BackendHandle::Stub(e) => e.embed(texts).await,
            BackendHandle::Remote(e) => e.embed(texts).await,
            #[cfg(feature = "onnx")]
            BackendHandle::Onnx(e) => e.embed(texts).await,
        }
    }

    fn dimension(&self) -> usize {
        match self {
            BackendHandle::Stub(e) => e.dimension(),
            BackendHandle::Remote(e) => e.dimension(),
            #[cfg(feature = "onnx")]
            BackendHandle::Onnx(e) => e.dimension(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_embedder_defaults_to_stub() {
        let embedder = build_embedder(EmbedderConfig::default()).unwrap();
        let out = embedder.embed(&["hello"]).await.unwrap();
        assert_eq!(out[0].len(), 384);
    }

    #[tokio::test]
    async fn onnx_without_feature_is_a_hard_error() {
        let cfg = EmbedderConfig {
            mode: EmbedderMode::Onnx,
            ..Default::default()
        };
        #[cfg(not(feature = "onnx"))]
        assert!(build_embedder(cfg).is_err());
        #[cfg(feature = "onnx")]
        let _ = cfg;
    }
}
