use crate::{EmbedError, Embedder};
use async_trait::async_trait;
use citegraph_core::types::{normalize_text, sha256_hex};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Wraps any [`Embedder`] with an LRU cache keyed by the SHA-256 hex of the
/// lowercased, whitespace-collapsed text (spec.md §4.2).
///
/// Concurrent readers share the cache; a single writer applies on eviction,
/// consistent with §5's shared-resource concurrency rules — enforced here by
/// a `parking_lot::Mutex` guarding the whole LRU rather than per-entry
/// locking, since entries are small and contention is expected to be low.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: Mutex<LruCache<String, Arc<Vec<f32>>>>,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn cache_key(text: &str) -> String {
        sha256_hex(&normalize_text(text))
    }
}

#[async_trait]
impl<E: Embedder + Send + Sync> Embedder for CachedEmbedder<E> {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut results: Vec<Option<Arc<Vec<f32>>>> = vec![None; texts.len()];
        let mut misses: Vec<usize> = Vec::new();

        {
            let mut cache = self.cache.lock();
            for (i, text) in texts.iter().enumerate() {
                let key = Self::cache_key(text);
                match cache.get(&key) {
                    Some(vector) => results[i] = Some(vector.clone()),
                    None => misses.push(i),
                }
            }
        }

        if !misses.is_empty() {
            let miss_texts: Vec<&str> = misses.iter().map(|&i| texts[i]).collect();
            let fresh = self.inner.embed(&miss_texts).await?;
            let mut cache = self.cache.lock();
            for (&idx, vector) in misses.iter().zip(fresh) {
                let key = Self::cache_key(texts[idx]);
                let arc = Arc::new(vector);
                cache.put(key, arc.clone());
                results[idx] = Some(arc);
            }
        }

        Ok(results
            .into_iter()
            .map(|v| v.expect("every index filled by hit or miss pass").as_ref().clone())
            .collect())
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubEmbedder;

    #[tokio::test]
    async fn repeated_text_hits_cache_and_matches_uncached_result() {
        let cached = CachedEmbedder::new(StubEmbedder::new(16), 10);
        let direct = StubEmbedder::new(16);

        let first = cached.embed(&["hello world"]).await.unwrap();
        let second = cached.embed(&["Hello   World"]).await.unwrap();
        let baseline = direct.embed(&["hello world"]).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, baseline);
    }

    #[tokio::test]
    async fn mixed_batch_resolves_hits_and_misses_in_order() {
        let cached = CachedEmbedder::new(StubEmbedder::new(16), 10);
        let _ = cached.embed(&["alpha"]).await.unwrap();
        let batch = cached.embed(&["alpha", "beta", "alpha"]).await.unwrap();
        assert_eq!(batch[0], batch[2]);
        assert_ne!(batch[0], batch[1]);
    }
}
