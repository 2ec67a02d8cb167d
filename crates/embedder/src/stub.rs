use crate::{EmbedError, Embedder};
use async_trait::async_trait;

/// Deterministic hash-based embedder: no model to load, always succeeds.
///
/// Used in tests and as the last-resort fallback so the pipeline's
/// `embedding_unavailable` failure mode is reserved for genuine
/// configuration errors, not "no model on disk".
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let normalized = citegraph_core::types::normalize_text(text);
        let mut vector = vec![0.0f32; self.dimension];
        let mut seed: u64 = 1469598103934665603;
        for byte in normalized.as_bytes() {
            seed ^= *byte as u64;
            seed = seed.wrapping_mul(1099511628211);
            let idx = (seed as usize) % self.dimension;
            vector[idx] += 1.0;
        }
        l2_normalize(&mut vector);
        vector
    }
}

pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_produces_same_vector() {
        let embedder = StubEmbedder::new(32);
        let a = embedder.embed(&["graph neural networks"]).await.unwrap();
        let b = embedder.embed(&["graph neural networks"]).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn vectors_are_unit_norm() {
        let embedder = StubEmbedder::new(16);
        let out = embedder.embed(&["some text to embed"]).await.unwrap();
        let norm: f32 = out[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn different_text_produces_different_vector() {
        let embedder = StubEmbedder::new(32);
        let a = embedder.embed(&["alpha"]).await.unwrap();
        let b = embedder.embed(&["beta"]).await.unwrap();
        assert_ne!(a, b);
    }
}
