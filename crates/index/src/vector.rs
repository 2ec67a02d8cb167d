//! Per-user vector index: every query is implicitly scoped to the querying
//! user's own corpus (spec.md §4.3), so each [`UserId`] gets its own
//! [`AnnIndex`] shard rather than one global index with a post-filter.

use crate::ann::{AnnConfig, AnnIndex};
use crate::IndexError;
use citegraph_core::types::{ChunkId, PaperId, UserId};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct ChunkMeta {
    paper_id: PaperId,
    ordinal: u32,
}

struct Entry {
    vector: Vec<f32>,
    meta: ChunkMeta,
}

struct UserShard {
    entries: HashMap<ChunkId, Entry>,
    ann: AnnIndex,
    dirty: bool,
}

impl UserShard {
    fn new(dimension: usize, config: AnnConfig) -> Self {
        Self {
            entries: HashMap::new(),
            ann: AnnIndex::new(dimension, config),
            dirty: true,
        }
    }

    fn rebuild(&mut self, dimension: usize, config: AnnConfig) {
        let mut ann = AnnIndex::new(dimension, config);
        for (chunk_id, entry) in &self.entries {
            ann.insert(chunk_id.to_string(), entry.vector.clone())
                .expect("entries already validated on insert");
        }
        ann.build();
        self.ann = ann;
        self.dirty = false;
    }
}

/// One [`AnnIndex`] per user, durable-write-then-index ordering enforced by
/// the caller (spec.md §4.3's "durable writes before indexed").
pub struct VectorIndex {
    dimension: usize,
    config: AnnConfig,
    shards: DashMap<UserId, RwLock<UserShard>>,
}

/// A single scored match from [`VectorIndex::search`].
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub chunk_id: ChunkId,
    pub paper_id: PaperId,
    pub ordinal: u32,
    pub similarity: f32,
}

impl VectorIndex {
    pub fn new(dimension: usize, config: AnnConfig) -> Self {
        Self {
            dimension,
            config,
            shards: DashMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn upsert_chunk(
        &self,
        owner_id: UserId,
        chunk_id: ChunkId,
        paper_id: PaperId,
        ordinal: u32,
        vector: Vec<f32>,
    ) -> Result<(), IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        let shard = self
            .shards
            .entry(owner_id)
            .or_insert_with(|| RwLock::new(UserShard::new(self.dimension, self.config)));
        let mut shard = shard.write();
        shard.entries.insert(
            chunk_id,
            Entry {
                vector,
                meta: ChunkMeta { paper_id, ordinal },
            },
        );
        shard.dirty = true;
        Ok(())
    }

    /// Upserts every chunk of one paper under a single shard-lock
    /// acquisition, so a concurrent [`VectorIndex::search`] never observes a
    /// partial write (spec.md §4.3's "a read never sees a partially-inserted
    /// paper").
    pub fn upsert_chunks(
        &self,
        owner_id: UserId,
        chunks: &[(ChunkId, PaperId, u32, Vec<f32>)],
    ) -> Result<(), IndexError> {
        for (_, _, _, vector) in chunks {
            if vector.len() != self.dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimension,
                    got: vector.len(),
                });
            }
        }
        let shard = self
            .shards
            .entry(owner_id)
            .or_insert_with(|| RwLock::new(UserShard::new(self.dimension, self.config)));
        let mut shard = shard.write();
        for (chunk_id, paper_id, ordinal, vector) in chunks {
            shard.entries.insert(
                *chunk_id,
                Entry {
                    vector: vector.clone(),
                    meta: ChunkMeta {
                        paper_id: *paper_id,
                        ordinal: *ordinal,
                    },
                },
            );
        }
        shard.dirty = true;
        Ok(())
    }

    /// Removes every chunk belonging to `paper_id`, rebuilding the shard's
    /// graph immediately since deletions are rare compared to queries.
    pub fn remove_paper(&self, owner_id: UserId, paper_id: PaperId) {
        if let Some(shard) = self.shards.get(&owner_id) {
            let mut shard = shard.write();
            shard.entries.retain(|_, entry| entry.meta.paper_id != paper_id);
            shard.rebuild(self.dimension, self.config);
        }
    }

    pub fn search(&self, owner_id: UserId, query: &[f32], k: usize) -> Result<Vec<VectorHit>, IndexError> {
        let Some(shard) = self.shards.get(&owner_id) else {
            return Ok(Vec::new());
        };

        {
            let needs_rebuild = shard.read().dirty;
            if needs_rebuild {
                shard.write().rebuild(self.dimension, self.config);
            }
        }

        let shard = shard.read();
        let results = shard.ann.search(query, k)?;
        let mut hits: Vec<VectorHit> = results
            .into_iter()
            .filter_map(|r| {
                let id_str = shard.ann.get_id(r.index)?;
                let chunk_id = ChunkId(id_str.parse().ok()?);
                let entry = shard.entries.get(&chunk_id)?;
                Some(VectorHit {
                    chunk_id,
                    paper_id: entry.meta.paper_id,
                    ordinal: entry.meta.ordinal,
                    similarity: r.similarity,
                })
            })
            .collect();

        // Neither the exact scan nor hnsw_rs guarantee an order among tied
        // scores, so re-sort on the metadata we actually want determinism
        // over once results are back in hand.
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.paper_id.cmp(&b.paper_id))
                .then_with(|| a.ordinal.cmp(&b.ordinal))
        });
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid() -> UserId {
        UserId(uuid::Uuid::new_v4())
    }

    #[test]
    fn search_scoped_to_owner_returns_empty_for_unknown_user() {
        let index = VectorIndex::new(2, AnnConfig::default());
        let hits = index.search(uid(), &[1.0, 0.0], 5).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn upsert_then_search_finds_the_chunk() {
        let index = VectorIndex::new(2, AnnConfig::default());
        let owner = uid();
        let paper = PaperId::new();
        let chunk = ChunkId::new();
        index
            .upsert_chunk(owner, chunk, paper, 0, vec![1.0, 0.0])
            .unwrap();
        let hits = index.search(owner, &[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, chunk);
    }

    #[test]
    fn tied_similarity_breaks_by_paper_id_then_ordinal() {
        let index = VectorIndex::new(2, AnnConfig::default());
        let owner = uid();
        let paper_a = PaperId::new();
        let paper_b = PaperId::new();
        let (first_paper, second_paper) = if paper_a < paper_b {
            (paper_a, paper_b)
        } else {
            (paper_b, paper_a)
        };

        index
            .upsert_chunk(owner, ChunkId::new(), second_paper, 3, vec![1.0, 0.0])
            .unwrap();
        index
            .upsert_chunk(owner, ChunkId::new(), first_paper, 7, vec![1.0, 0.0])
            .unwrap();
        index
            .upsert_chunk(owner, ChunkId::new(), first_paper, 1, vec![1.0, 0.0])
            .unwrap();

        let hits = index.search(owner, &[1.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].paper_id, first_paper);
        assert_eq!(hits[0].ordinal, 1);
        assert_eq!(hits[1].paper_id, first_paper);
        assert_eq!(hits[1].ordinal, 7);
        assert_eq!(hits[2].paper_id, second_paper);
    }

    #[test]
    fn upsert_chunks_batch_makes_every_chunk_searchable() {
        let index = VectorIndex::new(2, AnnConfig::default());
        let owner = uid();
        let paper = PaperId::new();
        let batch = vec![
            (ChunkId::new(), paper, 0, vec![1.0, 0.0]),
            (ChunkId::new(), paper, 1, vec![0.0, 1.0]),
        ];
        index.upsert_chunks(owner, &batch).unwrap();

        let hits = index.search(owner, &[1.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn remove_paper_drops_its_chunks() {
        let index = VectorIndex::new(2, AnnConfig::default());
        let owner = uid();
        let paper = PaperId::new();
        index
            .upsert_chunk(owner, ChunkId::new(), paper, 0, vec![1.0, 0.0])
            .unwrap();
        index.remove_paper(owner, paper);
        let hits = index.search(owner, &[1.0, 0.0], 5).unwrap();
        assert!(hits.is_empty());
    }
}
