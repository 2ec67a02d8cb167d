//! End-to-end ingest -> suggest, exercising the umbrella crate's
//! [`citegraph::ingest_paper`] together with `citegraph-pipeline::suggest`,
//! the way `tests/pipeline_integration.rs` in the teacher repo drives
//! `ucfp::big_text_demo` through its own pipeline end to end.

use citegraph::types::{Paper, PaperId, UserId};
use citegraph::EnvConfig;
use citegraph_embedder::{Embedder, StubEmbedder};
use citegraph_index::{AnnConfig, Store};
use citegraph_pipeline::context::{PaperProvider, PaperSummary};
use citegraph_pipeline::{FocusContext, QueryContext, RetrievalConfig};
use citegraph_reranker::NullReranker;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DIMENSION: usize = 64;

struct FixedPaperProvider {
    papers: HashMap<PaperId, PaperSummary>,
}

#[async_trait::async_trait]
impl PaperProvider for FixedPaperProvider {
    async fn get_many(&self, paper_ids: &[PaperId]) -> HashMap<PaperId, PaperSummary> {
        paper_ids
            .iter()
            .filter_map(|id| self.papers.get(id).cloned().map(|p| (*id, p)))
            .collect()
    }
}

fn long_enough_text() -> String {
    "Transformer architectures replaced recurrent networks for sequence \
     modeling because self-attention parallelizes across the whole sequence. \
     The attention mechanism computes a weighted sum over value vectors, \
     where the weights come from a compatibility function between query and \
     key vectors. Multi-head attention runs several of these projections in \
     parallel before concatenating, which lets the model attend to \
     information from different representation subspaces at once. Positional \
     encodings are added to the input embeddings because the model otherwise \
     has no notion of token order. Subsequent citation-heavy work built \
     retrieval-augmented variants on top of this architecture."
        .repeat(3)
}

#[tokio::test]
async fn ingest_then_suggest_surfaces_the_ingested_paper() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("chunks.redb"), DIMENSION, AnnConfig::default())
        .expect("store should open");

    let embedder: Arc<dyn Embedder> = Arc::new(StubEmbedder::new(DIMENSION));
    let reranker = NullReranker;
    let cfg = EnvConfig::default();
    let owner_id = UserId(uuid::Uuid::new_v4());

    let mut paper = Paper::new(owner_id, "Attention Is All You Need");
    paper.authors = vec!["Ashish Vaswani".into()];
    paper.year = Some(2017);

    citegraph::ingest_paper(&mut paper, long_enough_text(), &store, embedder.as_ref(), &cfg)
        .await
        .expect("ingestion should succeed");
    assert!(paper.chunk_count > 0);

    let mut papers = HashMap::new();
    papers.insert(
        paper.id,
        PaperSummary {
            id: paper.id,
            title: paper.title.clone(),
            authors: paper.authors.clone(),
            year: paper.year,
            citation_count: None,
        },
    );
    let provider = FixedPaperProvider { papers };

    let query = QueryContext {
        user_id: owner_id,
        focus: FocusContext {
            current_sentence: "How does self-attention let a transformer model sequence order?"
                .to_string(),
            previous_sentence: None,
            next_sentence: None,
            paragraph: None,
            cursor_position: None,
        },
        config: RetrievalConfig::default(),
    };

    let cancel = CancellationToken::new();
    let suggestions = citegraph_pipeline::suggest(
        query,
        &store,
        embedder.as_ref(),
        &reranker,
        &provider,
        &cfg,
        &cancel,
    )
    .await
    .expect("suggest should succeed");

    assert!(!suggestions.items.is_empty());
    assert_eq!(suggestions.items[0].paper_id, paper.id);
}

#[tokio::test]
async fn suggest_returns_empty_for_a_user_with_no_papers() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("chunks.redb"), DIMENSION, AnnConfig::default())
        .expect("store should open");
    let embedder: Arc<dyn Embedder> = Arc::new(StubEmbedder::new(DIMENSION));
    let reranker = NullReranker;
    let cfg = EnvConfig::default();
    let provider = FixedPaperProvider { papers: HashMap::new() };

    let query = QueryContext {
        user_id: UserId(uuid::Uuid::new_v4()),
        focus: FocusContext {
            current_sentence: "An unrelated sentence about something else entirely.".to_string(),
            previous_sentence: None,
            next_sentence: None,
            paragraph: None,
            cursor_position: None,
        },
        config: RetrievalConfig::default(),
    };

    let cancel = CancellationToken::new();
    let suggestions = citegraph_pipeline::suggest(
        query,
        &store,
        embedder.as_ref(),
        &reranker,
        &provider,
        &cfg,
        &cancel,
    )
    .await
    .expect("suggest should succeed even with an empty corpus");

    assert!(suggestions.items.is_empty());
}
