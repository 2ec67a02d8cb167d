//! Approximate nearest-neighbor search over one user's chunk vectors.
//!
//! Wraps `hnsw_rs`'s HNSW graph, falling back to an exact linear cosine scan
//! below [`AnnConfig::min_vectors_for_ann`] — the common case for a single
//! writer's paper library, where a few hundred chunks make approximation
//! unnecessary overhead rather than a speed win.

use hnsw_rs::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnConfig {
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub max_results: usize,
    pub enabled: bool,
    pub min_vectors_for_ann: usize,
}

impl Default for AnnConfig {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 50,
            max_results: 100,
            enabled: true,
            min_vectors_for_ann: 1000,
        }
    }
}

impl AnnConfig {
    pub fn should_use_ann(&self, num_vectors: usize) -> bool {
        self.enabled && num_vectors >= self.min_vectors_for_ann
    }
}

#[derive(Debug, Clone)]
pub struct AnnResult {
    pub index: usize,
    /// Cosine similarity in `[-1, 1]`, higher is closer.
    pub similarity: f32,
}

/// One user's vector shard: HNSW graph plus the exact-scan fallback over
/// the same backing vectors.
pub struct AnnIndex {
    config: AnnConfig,
    dimension: usize,
    hnsw: Option<Hnsw<'static, f32, DistCosine>>,
    id_to_index: HashMap<String, usize>,
    index_to_id: HashMap<usize, String>,
    vectors: Vec<Vec<f32>>,
    built: bool,
}

impl AnnIndex {
    pub fn new(dimension: usize, config: AnnConfig) -> Self {
        Self {
            config,
            dimension,
            hnsw: None,
            id_to_index: HashMap::new(),
            index_to_id: HashMap::new(),
            vectors: Vec::new(),
            built: false,
        }
    }

    pub fn insert(&mut self, id: String, vector: Vec<f32>) -> Result<(), crate::IndexError> {
        if vector.len() != self.dimension {
            return Err(crate::IndexError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        let index = self.vectors.len();
        self.vectors.push(vector);
        self.id_to_index.insert(id.clone(), index);
        self.index_to_id.insert(index, id);
        self.built = false;
        Ok(())
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<AnnResult>, crate::IndexError> {
        if query.len() != self.dimension {
            return Err(crate::IndexError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        let k = k.min(self.config.max_results);

        if self.built && self.config.should_use_ann(self.vectors.len()) && self.hnsw.is_some() {
            Ok(self.hnsw_search(query, k))
        } else {
            Ok(self.linear_search(query, k))
        }
    }

    fn hnsw_search(&self, query: &[f32], k: usize) -> Vec<AnnResult> {
        let hnsw = self.hnsw.as_ref().expect("checked by caller");
        hnsw.search(query, k, self.config.ef_search)
            .into_iter()
            .map(|n| AnnResult {
                index: n.get_origin_id(),
                similarity: 1.0 - n.distance,
            })
            .collect()
    }

    fn linear_search(&self, query: &[f32], k: usize) -> Vec<AnnResult> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, v)| (idx, cosine_similarity(query, v)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(k)
            .map(|(index, similarity)| AnnResult { index, similarity })
            .collect()
    }

    pub fn get_id(&self, index: usize) -> Option<&String> {
        self.index_to_id.get(&index)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Builds the HNSW graph over the current vectors. A no-op below 10
    /// vectors, since HNSW needs a handful of points to form useful layers;
    /// `search` already falls back to `linear_search` in that case.
    pub fn build(&mut self) {
        if self.vectors.is_empty() {
            self.built = true;
            return;
        }
        let nb_elem = self.vectors.len();
        if nb_elem < 10 {
            self.built = true;
            return;
        }
        let nb_layer = 16.min((nb_elem as f32).ln().trunc() as usize).max(1);
        let hnsw = Hnsw::<f32, DistCosine>::new(
            self.config.m,
            nb_elem,
            nb_layer,
            self.config.ef_construction,
            DistCosine {},
        );
        let data: Vec<(&Vec<f32>, usize)> = self.vectors.iter().zip(0..).collect();
        hnsw.parallel_insert(&data);
        self.hnsw = Some(hnsw);
        self.built = true;
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return -1.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_rejects_wrong_dimension() {
        let mut idx = AnnIndex::new(4, AnnConfig::default());
        let err = idx.insert("a".into(), vec![1.0, 0.0]).unwrap_err();
        assert!(matches!(err, crate::IndexError::DimensionMismatch { .. }));
    }

    #[test]
    fn linear_search_orders_by_similarity_descending() {
        let mut idx = AnnIndex::new(2, AnnConfig::default());
        idx.insert("a".into(), vec![1.0, 0.0]).unwrap();
        idx.insert("b".into(), vec![0.0, 1.0]).unwrap();
        idx.insert("c".into(), vec![0.9, 0.1]).unwrap();
        idx.build();
        let results = idx.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(idx.get_id(results[0].index).unwrap(), "a");
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[test]
    fn small_index_never_uses_hnsw() {
        let cfg = AnnConfig {
            min_vectors_for_ann: 2,
            ..Default::default()
        };
        let mut idx = AnnIndex::new(2, cfg);
        idx.insert("a".into(), vec![1.0, 0.0]).unwrap();
        idx.build();
        assert!(idx.search(&[1.0, 0.0], 1).is_ok());
    }
}
