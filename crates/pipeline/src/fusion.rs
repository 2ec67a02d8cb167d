//! Score fusion over vector and lexical candidate lists (spec.md §4.6 step 4).

use citegraph_core::types::{ChunkId, PaperId};
use citegraph_index::VectorHit;
use std::collections::HashMap;

/// Min-max normalises a score list to `[0, 1]`. A constant list (including
/// a single-element list) maps every score to `0.5`.
fn min_max_normalize(scores: &HashMap<ChunkId, f32>) -> HashMap<ChunkId, f32> {
    if scores.is_empty() {
        return HashMap::new();
    }
    let min = scores.values().copied().fold(f32::INFINITY, f32::min);
    let max = scores.values().copied().fold(f32::NEG_INFINITY, f32::max);
    let spread = max - min;
    scores
        .iter()
        .map(|(id, &score)| {
            let normalized = if spread <= f32::EPSILON { 0.5 } else { (score - min) / spread };
            (*id, normalized)
        })
        .collect()
}

/// One chunk surviving fusion, carrying both raw and fused scores plus the
/// metadata the aggregation and display stages need.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub chunk_id: ChunkId,
    pub paper_id: PaperId,
    pub ordinal: u32,
    pub vector_score: Option<f32>,
    pub lexical_score: Option<f32>,
    pub fused_score: f32,
}

/// Combines vector and lexical candidate lists into one fused ranking.
/// `lexical` is `None` when the lexical branch degraded or was skipped —
/// fusion then falls back to the vector-normalised score alone.
pub fn fuse(
    vector_hits: &[VectorHit],
    lexical_hits: &[(ChunkId, f32, PaperId, u32)],
    weight_vector: f32,
    weight_lexical: f32,
) -> Vec<FusedCandidate> {
    let vector_raw: HashMap<ChunkId, f32> = vector_hits.iter().map(|h| (h.chunk_id, h.similarity)).collect();
    let lexical_raw: HashMap<ChunkId, f32> = lexical_hits.iter().map(|(id, score, _, _)| (*id, *score)).collect();

    let vector_norm = min_max_normalize(&vector_raw);
    let lexical_norm = min_max_normalize(&lexical_raw);

    let mut meta: HashMap<ChunkId, (PaperId, u32)> = HashMap::new();
    for hit in vector_hits {
        meta.insert(hit.chunk_id, (hit.paper_id, hit.ordinal));
    }
    for (id, _, paper_id, ordinal) in lexical_hits {
        meta.entry(*id).or_insert((*paper_id, *ordinal));
    }

    let mut all_ids: Vec<ChunkId> = vector_norm.keys().chain(lexical_norm.keys()).copied().collect();
    all_ids.sort();
    all_ids.dedup();

    let mut candidates: Vec<FusedCandidate> = all_ids
        .into_iter()
        .filter_map(|chunk_id| {
            let (paper_id, ordinal) = *meta.get(&chunk_id)?;
            let v = vector_norm.get(&chunk_id).copied();
            let b = lexical_norm.get(&chunk_id).copied();
            let fused_score = weight_vector * v.unwrap_or(0.0) + weight_lexical * b.unwrap_or(0.0);
            Some(FusedCandidate {
                chunk_id,
                paper_id,
                ordinal,
                vector_score: vector_raw.get(&chunk_id).copied(),
                lexical_score: lexical_raw.get(&chunk_id).copied(),
                fused_score,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.vector_score
                    .unwrap_or(0.0)
                    .partial_cmp(&a.vector_score.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| (a.paper_id, a.ordinal).cmp(&(b.paper_id, b.ordinal)))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(chunk_id: ChunkId, paper_id: PaperId, ordinal: u32, similarity: f32) -> VectorHit {
        VectorHit {
            chunk_id,
            paper_id,
            ordinal,
            similarity,
        }
    }

    #[test]
    fn fuses_overlapping_candidates_with_default_weights() {
        let paper = PaperId::new();
        let a = ChunkId::new();
        let b = ChunkId::new();
        let vector_hits = vec![hit(a, paper, 0, 0.9), hit(b, paper, 1, 0.1)];
        let lexical_hits = vec![(a, 5.0, paper, 0), (b, 1.0, paper, 1)];

        let fused = fuse(&vector_hits, &lexical_hits, 0.6, 0.4);
        assert_eq!(fused[0].chunk_id, a);
        assert!(fused[0].fused_score > fused[1].fused_score);
    }

    #[test]
    fn vector_only_candidate_treats_missing_lexical_as_zero() {
        let paper = PaperId::new();
        let a = ChunkId::new();
        let vector_hits = vec![hit(a, paper, 0, 1.0)];
        let fused = fuse(&vector_hits, &[], 0.6, 0.4);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].fused_score - 0.3).abs() < 1e-6);
    }
}
