use crate::{RerankError, Reranker};
use citegraph_core::types::ChunkId;

/// No-op reranker: returns the input order untouched with score `0.0`.
///
/// The default when the `rerank` feature is off or `enable_reranking` is
/// false — the pipeline treats a [`NullReranker`] result the same as a
/// disabled rerank stage (spec.md §4.5, §4.6 step 6).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReranker;

#[async_trait::async_trait]
impl Reranker for NullReranker {
    async fn score(
        &self,
        _query: &str,
        candidates: &[(ChunkId, String)],
    ) -> Result<Vec<(ChunkId, f32)>, RerankError> {
        Ok(candidates.iter().map(|(id, _)| (*id, 0.0)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preserves_input_order_with_zero_scores() {
        let reranker = NullReranker;
        let a = ChunkId::new();
        let b = ChunkId::new();
        let result = reranker
            .score("query", &[(a, "one".into()), (b, "two".into())])
            .await
            .unwrap();
        assert_eq!(result, vec![(a, 0.0), (b, 0.0)]);
    }
}
