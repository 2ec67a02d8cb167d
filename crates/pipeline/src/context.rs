//! Public input/output types for [`crate::suggest`] (spec.md §3, §6).

use citegraph_core::types::{ChunkId, PageSpan, PaperId, UserId};
use std::collections::HashMap;

/// The writing context a `suggest` call ranks against.
#[derive(Debug, Clone, Default)]
pub struct FocusContext {
    pub current_sentence: String,
    pub previous_sentence: Option<String>,
    pub next_sentence: Option<String>,
    pub paragraph: Option<String>,
    pub cursor_position: Option<u32>,
}

/// `searchStrategy` from `update_preferences` (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStrategy {
    Vector,
    Bm25,
    #[default]
    Hybrid,
}

/// A session's current retrieval configuration snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    pub strategy: SearchStrategy,
    /// `useEnhanced`: false degrades the pipeline to pure vector search,
    /// skipping lexical retrieval and rerank entirely.
    pub use_enhanced: bool,
    /// `useReranking`: toggles step 6 when the reranker is compiled in.
    pub use_reranking: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::Hybrid,
            use_enhanced: true,
            use_reranking: true,
        }
    }
}

/// The pipeline's public input: transient, never persisted (spec.md §3).
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub user_id: UserId,
    pub focus: FocusContext,
    pub config: RetrievalConfig,
}

/// Metadata snapshot the pipeline needs for aggregation, confidence
/// composition and `display_text` — supplied by whatever owns the
/// `papers` table (the server crate), not by the chunk/vector [`citegraph_index::Store`].
#[derive(Debug, Clone)]
pub struct PaperSummary {
    pub id: PaperId,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub citation_count: Option<u64>,
}

impl PaperSummary {
    pub fn first_author_surname(&self) -> Option<&str> {
        self.authors.first()?.split_whitespace().last()
    }
}

/// Supplies paper metadata by id; implemented by the server crate over its
/// `papers` table.
#[async_trait::async_trait]
pub trait PaperProvider: Send + Sync {
    async fn get_many(&self, paper_ids: &[PaperId]) -> HashMap<PaperId, PaperSummary>;
}

/// Per-chunk score breakdown surfaced to the client (spec.md §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkScores {
    pub vector: Option<f32>,
    pub lexical: Option<f32>,
    pub fused: Option<f32>,
    pub rerank: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationStyle {
    Inline,
    Footnote,
}

/// One ranked result (spec.md §3, §6 `suggestions` payload).
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub paper_id: PaperId,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub confidence: f32,
    pub citation_style: CitationStyle,
    pub display_text: String,
    pub chunk_id: ChunkId,
    pub chunk_preview: String,
    pub chunk_section: Option<String>,
    pub chunk_ordinal: u32,
    pub page_span: Option<PageSpan>,
    pub scores: ChunkScores,
}

/// Which branches degraded during one `suggest` call (spec.md §7).
#[derive(Debug, Clone, Copy, Default)]
pub struct Diagnostics {
    pub vector_degraded: bool,
    pub lexical_degraded: bool,
    pub rerank_skipped: bool,
    pub hybrid_branch_timed_out: bool,
}

/// The full result of one `suggest` call.
#[derive(Debug, Clone, Default)]
pub struct Suggestions {
    pub items: Vec<Suggestion>,
    pub diagnostics: Diagnostics,
}
