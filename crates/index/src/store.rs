//! Durable storage for chunks and their vectors, backed by `redb`.
//!
//! A paper's chunks are written in one `redb` write transaction so a reader
//! never observes a partial paper (spec.md §3 invariant, §5 "ingestion is
//! linearisable"). The in-memory [`VectorIndex`] and [`LexicalIndex`] are
//! rebuilt from this durable store on open and kept in sync on every write,
//! mirroring `crates/index/src/backend/redb.rs`'s put/get/delete shape.

use crate::ann::AnnConfig;
use crate::lexical::LexicalIndex;
use crate::vector::VectorIndex;
use crate::IndexError;
use citegraph_core::types::{Chunk, ChunkId, PaperId, UserId};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const CHUNKS: TableDefinition<&str, &[u8]> = TableDefinition::new("chunks");
const PAPER_CHUNKS: TableDefinition<&str, &[u8]> = TableDefinition::new("paper_chunks");
const PAPER_OWNER: TableDefinition<&str, &str> = TableDefinition::new("paper_owner");

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    chunk: Chunk,
    owner_id: UserId,
}

/// Durable chunk/vector store plus the derived in-memory retrieval indices.
pub struct Store {
    db: Arc<Database>,
    pub vector_index: Arc<VectorIndex>,
    pub lexical_index: Arc<LexicalIndex>,
}

impl Store {
    /// Opens (or creates) the database at `path` and rebuilds the in-memory
    /// vector and lexical indices from whatever chunks are already durable.
    pub fn open<P: AsRef<Path>>(
        path: P,
        dimension: usize,
        ann_config: AnnConfig,
    ) -> Result<Self, IndexError> {
        let db = Database::create(path).map_err(|e| IndexError::backend(e.to_string()))?;
        {
            let write_txn = db.begin_write().map_err(|e| IndexError::backend(e.to_string()))?;
            write_txn.open_table(CHUNKS).map_err(|e| IndexError::backend(e.to_string()))?;
            write_txn
                .open_table(PAPER_CHUNKS)
                .map_err(|e| IndexError::backend(e.to_string()))?;
            write_txn
                .open_table(PAPER_OWNER)
                .map_err(|e| IndexError::backend(e.to_string()))?;
            write_txn.commit().map_err(|e| IndexError::backend(e.to_string()))?;
        }

        let vector_index = Arc::new(VectorIndex::new(dimension, ann_config));
        let lexical_index = Arc::new(LexicalIndex::new());

        let store = Self {
            db: Arc::new(db),
            vector_index,
            lexical_index,
        };
        store.rebuild_in_memory_indices()?;
        Ok(store)
    }

    fn rebuild_in_memory_indices(&self) -> Result<(), IndexError> {
        let read_txn = self.db.begin_read().map_err(|e| IndexError::backend(e.to_string()))?;
        let table = read_txn.open_table(CHUNKS).map_err(|e| IndexError::backend(e.to_string()))?;

        let mut stored_chunks = Vec::new();
        for entry in table.iter().map_err(|e| IndexError::backend(e.to_string()))? {
            let (_, value) = entry.map_err(|e| IndexError::backend(e.to_string()))?;
            let stored: StoredChunk = bincode::deserialize(value.value())
                .map_err(|e| IndexError::Serialization(e.to_string()))?;
            stored_chunks.push(stored);
        }
        self.index_chunks_in_memory(&stored_chunks)
    }

    /// Upserts a batch of already-durable chunks into the in-memory vector
    /// and lexical indices, grouping by owner so each user's shard sees the
    /// whole batch under one lock acquisition rather than one chunk at a
    /// time — a reader scoped to that user never observes a paper with only
    /// some of its chunks indexed.
    fn index_chunks_in_memory(&self, stored_chunks: &[StoredChunk]) -> Result<(), IndexError> {
        let mut by_owner: HashMap<UserId, (Vec<(ChunkId, PaperId, u32, Vec<f32>)>, Vec<(ChunkId, PaperId, u32, String)>)> =
            HashMap::new();

        for stored in stored_chunks {
            let entry = by_owner.entry(stored.owner_id).or_default();
            if let Some(vector) = &stored.chunk.embedding {
                entry.0.push((
                    stored.chunk.id,
                    stored.chunk.paper_id,
                    stored.chunk.ordinal,
                    vector.clone(),
                ));
            }
            entry.1.push((
                stored.chunk.id,
                stored.chunk.paper_id,
                stored.chunk.ordinal,
                stored.chunk.text.clone(),
            ));
        }

        for (owner_id, (vector_batch, lexical_batch)) in by_owner {
            if !vector_batch.is_empty() {
                self.vector_index.upsert_chunks(owner_id, &vector_batch)?;
            }
            self.lexical_index.upsert_chunks(owner_id, &lexical_batch);
        }
        Ok(())
    }

    /// Fetches one chunk's durable record, used by the retrieval pipeline
    /// to build previews and rerank input text.
    pub async fn get_chunk(&self, chunk_id: ChunkId) -> Result<Option<Chunk>, IndexError> {
        let db = self.db.clone();
        let chunk_id_str = chunk_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<Chunk>, IndexError> {
            let read_txn = db.begin_read().map_err(|e| IndexError::backend(e.to_string()))?;
            let table = read_txn.open_table(CHUNKS).map_err(|e| IndexError::backend(e.to_string()))?;
            let Some(value) = table
                .get(chunk_id_str.as_str())
                .map_err(|e| IndexError::backend(e.to_string()))?
            else {
                return Ok(None);
            };
            let stored: StoredChunk = bincode::deserialize(value.value())
                .map_err(|e| IndexError::Serialization(e.to_string()))?;
            Ok(Some(stored.chunk))
        })
        .await
        .map_err(|e| IndexError::backend(e.to_string()))?
    }

    /// Writes every chunk of one paper in a single transaction, then
    /// updates the in-memory indices. Requires every chunk to already carry
    /// an embedding (the caller embeds before calling this).
    pub async fn write_paper_chunks(
        &self,
        owner_id: UserId,
        paper_id: PaperId,
        chunks: &[Chunk],
    ) -> Result<(), IndexError> {
        let db = self.db.clone();
        let owned_chunks = chunks.to_vec();
        let paper_id_str = paper_id.to_string();
        let owner_id_str = owner_id.to_string();

        let stored_chunks = tokio::task::spawn_blocking(move || -> Result<Vec<StoredChunk>, IndexError> {
            let write_txn = db.begin_write().map_err(|e| IndexError::backend(e.to_string()))?;
            let mut stored_chunks = Vec::with_capacity(owned_chunks.len());
            {
                let mut chunks_table =
                    write_txn.open_table(CHUNKS).map_err(|e| IndexError::backend(e.to_string()))?;
                let mut paper_chunks_table = write_txn
                    .open_table(PAPER_CHUNKS)
                    .map_err(|e| IndexError::backend(e.to_string()))?;
                let mut paper_owner_table = write_txn
                    .open_table(PAPER_OWNER)
                    .map_err(|e| IndexError::backend(e.to_string()))?;

                let mut chunk_id_strings = Vec::with_capacity(owned_chunks.len());
                for chunk in owned_chunks {
                    if chunk.embedding.is_none() {
                        return Err(IndexError::backend("chunk written without an embedding"));
                    }
                    let chunk_id_str = chunk.id.to_string();
                    let stored = StoredChunk { chunk, owner_id };
                    let bytes = bincode::serialize(&stored)
                        .map_err(|e| IndexError::Serialization(e.to_string()))?;
                    chunks_table
                        .insert(chunk_id_str.as_str(), bytes.as_slice())
                        .map_err(|e| IndexError::backend(e.to_string()))?;
                    chunk_id_strings.push(chunk_id_str);
                    stored_chunks.push(stored);
                }

                let ids_bytes = bincode::serialize(&chunk_id_strings)
                    .map_err(|e| IndexError::Serialization(e.to_string()))?;
                paper_chunks_table
                    .insert(paper_id_str.as_str(), ids_bytes.as_slice())
                    .map_err(|e| IndexError::backend(e.to_string()))?;
                paper_owner_table
                    .insert(paper_id_str.as_str(), owner_id_str.as_str())
                    .map_err(|e| IndexError::backend(e.to_string()))?;
            }
            write_txn.commit().map_err(|e| IndexError::backend(e.to_string()))?;
            Ok(stored_chunks)
        })
        .await
        .map_err(|e| IndexError::backend(e.to_string()))??;

        self.index_chunks_in_memory(&stored_chunks)
    }

    /// Cascades the deletion of a paper and all of its chunks.
    pub async fn delete_paper(&self, paper_id: PaperId) -> Result<(), IndexError> {
        let db = self.db.clone();
        let paper_id_str = paper_id.to_string();

        let owner = tokio::task::spawn_blocking(move || -> Result<Option<UserId>, IndexError> {
            let read_txn = db.begin_read().map_err(|e| IndexError::backend(e.to_string()))?;
            let owner_table = read_txn.open_table(PAPER_OWNER).map_err(|e| IndexError::backend(e.to_string()))?;
            let owner = owner_table
                .get(paper_id_str.as_str())
                .map_err(|e| IndexError::backend(e.to_string()))?
                .map(|v| v.value().parse::<uuid::Uuid>())
                .transpose()
                .map_err(|e| IndexError::backend(e.to_string()))?
                .map(UserId);
            drop(owner_table);

            let chunk_ids_table = read_txn.open_table(PAPER_CHUNKS).map_err(|e| IndexError::backend(e.to_string()))?;
            let chunk_ids: Vec<String> = chunk_ids_table
                .get(paper_id_str.as_str())
                .map_err(|e| IndexError::backend(e.to_string()))?
                .map(|v| bincode::deserialize(v.value()))
                .transpose()
                .map_err(|e| IndexError::Serialization(e.to_string()))?
                .unwrap_or_default();
            drop(chunk_ids_table);
            drop(read_txn);

            let write_txn = db.begin_write().map_err(|e| IndexError::backend(e.to_string()))?;
            {
                let mut chunks_table =
                    write_txn.open_table(CHUNKS).map_err(|e| IndexError::backend(e.to_string()))?;
                for chunk_id in &chunk_ids {
                    chunks_table
                        .remove(chunk_id.as_str())
                        .map_err(|e| IndexError::backend(e.to_string()))?;
                }
                let mut paper_chunks_table = write_txn
                    .open_table(PAPER_CHUNKS)
                    .map_err(|e| IndexError::backend(e.to_string()))?;
                paper_chunks_table
                    .remove(paper_id_str.as_str())
                    .map_err(|e| IndexError::backend(e.to_string()))?;
                let mut paper_owner_table = write_txn
                    .open_table(PAPER_OWNER)
                    .map_err(|e| IndexError::backend(e.to_string()))?;
                paper_owner_table
                    .remove(paper_id_str.as_str())
                    .map_err(|e| IndexError::backend(e.to_string()))?;
            }
            write_txn.commit().map_err(|e| IndexError::backend(e.to_string()))?;
            Ok(owner)
        })
        .await
        .map_err(|e| IndexError::backend(e.to_string()))??;

        if let Some(owner_id) = owner {
            self.vector_index.remove_paper(owner_id, paper_id);
            self.lexical_index.remove_paper(owner_id, paper_id);
        }
        Ok(())
    }

    pub fn chunk_id_display(id: ChunkId) -> String {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citegraph_core::types::{ChunkId as Cid, PageSpan};

    fn sample_chunk(paper_id: PaperId, ordinal: u32, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: Cid::new(),
            paper_id,
            ordinal,
            text: format!("chunk body {ordinal}"),
            section_label: None,
            page_span: None::<PageSpan>,
            word_count: 3,
            token_len: 4,
            content_hash: "hash".into(),
            embedding: Some(embedding),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn write_then_search_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("test.redb"), 2, AnnConfig::default()).unwrap();
        let owner = UserId(uuid::Uuid::new_v4());
        let paper = PaperId::new();
        let chunk = sample_chunk(paper, 0, vec![1.0, 0.0]);

        store
            .write_paper_chunks(owner, paper, std::slice::from_ref(&chunk))
            .await
            .unwrap();

        let hits = store.vector_index.search(owner, &[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, chunk.id);
    }

    #[tokio::test]
    async fn all_chunks_of_a_paper_become_searchable_together() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("test.redb"), 2, AnnConfig::default()).unwrap();
        let owner = UserId(uuid::Uuid::new_v4());
        let paper = PaperId::new();
        let chunks = vec![
            sample_chunk(paper, 0, vec![1.0, 0.0]),
            sample_chunk(paper, 1, vec![0.9, 0.1]),
            sample_chunk(paper, 2, vec![0.8, 0.2]),
        ];

        store.write_paper_chunks(owner, paper, &chunks).await.unwrap();

        let hits = store.vector_index.search(owner, &[1.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 3);
        for chunk in &chunks {
            assert!(hits.iter().any(|h| h.chunk_id == chunk.id));
        }
    }

    #[tokio::test]
    async fn get_chunk_returns_the_durable_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("test.redb"), 2, AnnConfig::default()).unwrap();
        let owner = UserId(uuid::Uuid::new_v4());
        let paper = PaperId::new();
        let chunk = sample_chunk(paper, 0, vec![1.0, 0.0]);

        store
            .write_paper_chunks(owner, paper, std::slice::from_ref(&chunk))
            .await
            .unwrap();

        let fetched = store.get_chunk(chunk.id).await.unwrap();
        assert_eq!(fetched.unwrap().text, chunk.text);
        assert!(store.get_chunk(Cid::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_paper_clears_both_indices() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("test.redb"), 2, AnnConfig::default()).unwrap();
        let owner = UserId(uuid::Uuid::new_v4());
        let paper = PaperId::new();
        let chunk = sample_chunk(paper, 0, vec![1.0, 0.0]);

        store
            .write_paper_chunks(owner, paper, std::slice::from_ref(&chunk))
            .await
            .unwrap();
        store.delete_paper(paper).await.unwrap();

        let hits = store.vector_index.search(owner, &[1.0, 0.0], 5).unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn reopen_rebuilds_indices_from_durable_state() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");
        let owner = UserId(uuid::Uuid::new_v4());
        let paper = PaperId::new();
        let chunk = sample_chunk(paper, 0, vec![0.0, 1.0]);

        {
            let store = Store::open(&db_path, 2, AnnConfig::default()).unwrap();
            store
                .write_paper_chunks(owner, paper, std::slice::from_ref(&chunk))
                .await
                .unwrap();
        }

        let reopened = Store::open(&db_path, 2, AnnConfig::default()).unwrap();
        let hits = reopened.vector_index.search(owner, &[0.0, 1.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
    }
}
