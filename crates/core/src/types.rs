//! The persisted data model: [`Paper`] and [`Chunk`], and the processing
//! state machine that governs ingestion (spec.md §3, §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier for a [`Paper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(pub Uuid);

impl PaperId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short prefix used as the fallback `display_text` token (spec.md §4.6 step 9).
    pub fn short_prefix(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for PaperId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier for a [`Chunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub Uuid);

impl ChunkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the writer who owns a paper; used for per-user isolation (P5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ingestion state machine (spec.md §4.6, §7): `pending -> processing ->
/// {indexed | failed}`. Retry from `failed` resets to `processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Indexed,
    Failed,
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Indexed => "indexed",
            ProcessingStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Why a paper landed in [`ProcessingStatus::Failed`] (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoContent,
    EmbeddingFailed,
    IndexWriteFailed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::NoContent => "no_content",
            FailureReason::EmbeddingFailed => "embedding_failed",
            FailureReason::IndexWriteFailed => "index_write_failed",
        };
        write!(f, "{s}")
    }
}

/// External identifiers for a paper (DOI, arXiv id, ...). Populated by the
/// external metadata-resolution collaborator (out of scope, spec.md §1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalIds {
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
}

/// A logical work with stable identity (spec.md §3).
///
/// Created at upload, mutated only by the ingestion pipeline (status, chunk
/// count) and by external metadata resolution (descriptive fields). Never
/// destroyed implicitly; removal cascades to its chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,
    pub owner_id: UserId,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub external_ids: ExternalIds,
    pub citation_count: Option<u64>,
    pub status: ProcessingStatus,
    pub failure_reason: Option<FailureReason>,
    pub chunk_count: usize,
    pub has_file: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Paper {
    pub fn new(owner_id: UserId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PaperId::new(),
            owner_id,
            title: title.into(),
            authors: Vec::new(),
            year: None,
            venue: None,
            external_ids: ExternalIds::default(),
            citation_count: None,
            status: ProcessingStatus::Pending,
            failure_reason: None,
            chunk_count: 0,
            has_file: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// First author's surname, used when composing `display_text` (spec.md §4.6 step 9).
    pub fn first_author_surname(&self) -> Option<&str> {
        let full = self.authors.first()?;
        full.split_whitespace().last()
    }

    fn transition(&mut self, status: ProcessingStatus, reason: Option<FailureReason>) {
        let from = self.status;
        self.status = status;
        self.failure_reason = reason;
        self.updated_at = Utc::now();
        tracing::info!(
            paper_id = %self.id,
            from = %from,
            to = %status,
            reason = ?reason,
            "paper_status_transition"
        );
    }

    pub fn mark_processing(&mut self) {
        self.transition(ProcessingStatus::Processing, None);
    }

    pub fn mark_indexed(&mut self, chunk_count: usize) {
        self.chunk_count = chunk_count;
        self.transition(ProcessingStatus::Indexed, None);
    }

    pub fn mark_failed(&mut self, reason: FailureReason) {
        self.transition(ProcessingStatus::Failed, Some(reason));
    }
}

/// Inclusive page span `[first, last]` covered by a chunk, when the upstream
/// text extraction supplies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpan {
    pub first: u32,
    pub last: u32,
}

/// A retrievable passage of one paper (spec.md §3).
///
/// Invariants enforced by [`crate::ingest_paper`] and by the chunker/embedder
/// crates: `(paper_id, ordinal)` is unique and dense from 0; text is
/// non-empty; every chunk either has an embedding or its paper is not
/// `indexed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub paper_id: PaperId,
    pub ordinal: u32,
    pub text: String,
    pub section_label: Option<String>,
    pub page_span: Option<PageSpan>,
    pub word_count: u32,
    pub token_len: u32,
    /// SHA-256 of the raw text; embedding cache key and idempotency guard.
    pub content_hash: String,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    pub fn is_embedded(&self) -> bool {
        self.embedding.as_ref().is_some_and(|v| !v.is_empty())
    }
}

/// SHA-256 hex digest, used for [`Chunk::content_hash`] and the embedding
/// cache key (spec.md §4.2).
pub fn sha256_hex(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Lowercase + collapse internal whitespace, the normalisation the Embedder
/// cache key and the BM25 tokenizer both apply before hashing/hashing-adjacent
/// work (spec.md §4.2, §4.4).
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_lowercases() {
        assert_eq!(normalize_text("  Hello   WORLD\n"), "hello world");
    }

    #[test]
    fn paper_transitions_track_failure_reason() {
        let mut paper = Paper::new(UserId(Uuid::nil()), "Attention Is All You Need");
        paper.mark_processing();
        assert_eq!(paper.status, ProcessingStatus::Processing);
        paper.mark_failed(FailureReason::NoContent);
        assert_eq!(paper.status, ProcessingStatus::Failed);
        assert_eq!(paper.failure_reason, Some(FailureReason::NoContent));
    }

    #[test]
    fn indexed_requires_explicit_chunk_count() {
        let mut paper = Paper::new(UserId(Uuid::nil()), "Doc");
        paper.mark_processing();
        paper.mark_indexed(12);
        assert_eq!(paper.status, ProcessingStatus::Indexed);
        assert_eq!(paper.chunk_count, 12);
    }

    #[test]
    fn first_author_surname_picks_last_token() {
        let mut paper = Paper::new(UserId(Uuid::nil()), "Doc");
        paper.authors.push("Ada Lovelace".into());
        assert_eq!(paper.first_author_surname(), Some("Lovelace"));
    }
}
