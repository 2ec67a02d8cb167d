//! Retrieval orchestrator: the ten-step `suggest` algorithm (spec.md §4.6).
//!
//! Orchestration style mirrors the umbrella crate's `ingest_paper`: one
//! function per stage transition, a single error enum wrapping each
//! stage's failure, and install-once [`PipelineMetrics`]/[`PipelineEventLogger`]
//! hooks so a server process can attach latency histograms without
//! threading a handle through every call.

mod confidence;
pub mod context;
mod deadline;
mod error;
mod fusion;

pub use context::{
    ChunkScores, CitationStyle, Diagnostics, FocusContext, PaperProvider, PaperSummary,
    QueryContext, RetrievalConfig, SearchStrategy, Suggestion, Suggestions,
};
pub use deadline::Deadline;
pub use error::RetrievalError;

use citegraph_core::types::{ChunkId, PaperId};
use citegraph_core::EnvConfig;
use citegraph_embedder::Embedder;
use citegraph_index::{Store, VectorHit};
use citegraph_reranker::Reranker;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Metrics observer for retrieval stages.
pub trait PipelineMetrics: Send + Sync {
    fn record_stage(&self, stage: &str, latency: Duration, ok: bool);
}

/// Structured event emitted once per `suggest` call.
#[derive(Debug, Clone)]
pub struct PipelineEvent {
    pub user_id: String,
    pub latency: Duration,
    pub result_count: usize,
    pub error_code: Option<&'static str>,
}

pub trait PipelineEventLogger: Send + Sync {
    fn log(&self, event: &PipelineEvent);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    *metrics_lock().write().expect("metrics lock poisoned") = recorder;
}

fn logger_lock() -> &'static RwLock<Option<Arc<dyn PipelineEventLogger>>> {
    static LOGGER: OnceLock<RwLock<Option<Arc<dyn PipelineEventLogger>>>> = OnceLock::new();
    LOGGER.get_or_init(|| RwLock::new(None))
}

pub fn set_pipeline_logger(logger: Option<Arc<dyn PipelineEventLogger>>) {
    *logger_lock().write().expect("logger lock poisoned") = logger;
}

fn emit(stage: &str, start: Instant, ok: bool) {
    if let Some(m) = metrics_lock().read().unwrap_or_else(|p| p.into_inner()).clone() {
        m.record_stage(stage, start.elapsed(), ok);
    }
}

fn extract_focus_text(focus: &FocusContext, min_query_chars: usize) -> Option<String> {
    let current = focus.current_sentence.trim();
    if current.chars().count() < min_query_chars {
        return None;
    }
    let mut parts = Vec::with_capacity(3);
    if let Some(prev) = &focus.previous_sentence {
        let prev = prev.trim();
        if !prev.is_empty() {
            parts.push(prev);
        }
    }
    parts.push(current);
    if let Some(next) = &focus.next_sentence {
        let next = next.trim();
        if !next.is_empty() {
            parts.push(next);
        }
    }
    Some(parts.join(" "))
}

async fn bounded_vector_search(
    store: &Store,
    owner_id: citegraph_core::types::UserId,
    query: Vec<f32>,
    k: usize,
    timeout: Duration,
) -> Option<Vec<VectorHit>> {
    let vector_index = store.vector_index.clone();
    let fut = tokio::task::spawn_blocking(move || vector_index.search(owner_id, &query, k));
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(Ok(hits))) => Some(hits),
        _ => None,
    }
}

async fn bounded_lexical_search(
    store: &Store,
    owner_id: citegraph_core::types::UserId,
    query_text: String,
    k: usize,
    timeout: Duration,
    fit_max_docs: usize,
) -> Option<Option<Vec<(ChunkId, f32, PaperId, u32)>>> {
    let lexical_index = store.lexical_index.clone();
    if lexical_index.needs_refit(owner_id) {
        let refit_index = lexical_index.clone();
        let refit_fut = tokio::task::spawn_blocking(move || refit_index.refit(owner_id, fit_max_docs));
        if tokio::time::timeout(timeout, refit_fut).await.is_err() {
            return Some(None);
        }
    }
    let fut = tokio::task::spawn_blocking(move || lexical_index.search(owner_id, &query_text, k));
    tokio::time::timeout(timeout, fut).await.ok()?.ok()
}

/// Drives one retrieval request end to end (spec.md §4.6's ten steps).
pub async fn suggest(
    query: QueryContext,
    store: &Store,
    embedder: &dyn Embedder,
    reranker: &dyn Reranker,
    papers: &dyn PaperProvider,
    cfg: &EnvConfig,
    cancel: &CancellationToken,
) -> Result<Suggestions, RetrievalError> {
    let start = Instant::now();
    let user_id_str = query.user_id.to_string();

    let result = suggest_inner(query, store, embedder, reranker, papers, cfg, cancel).await;

    let (result_count, error_code) = match &result {
        Ok(s) => (s.items.len(), None),
        Err(e) => (0, Some(e.code())),
    };
    emit("suggest", start, result.is_ok());
    if let Some(l) = logger_lock().read().unwrap_or_else(|p| p.into_inner()).clone() {
        l.log(&PipelineEvent {
            user_id: user_id_str,
            latency: start.elapsed(),
            result_count,
            error_code,
        });
    }
    result
}

async fn suggest_inner(
    query: QueryContext,
    store: &Store,
    embedder: &dyn Embedder,
    reranker: &dyn Reranker,
    papers: &dyn PaperProvider,
    cfg: &EnvConfig,
    cancel: &CancellationToken,
) -> Result<Suggestions, RetrievalError> {
    let mut diagnostics = Diagnostics::default();
    let deadline = Deadline::after(Duration::from_secs(20));

    // Step 1: focus extraction.
    let Some(focus_text) = extract_focus_text(&query.focus, cfg.min_query_chars) else {
        return Ok(Suggestions::default());
    };

    let use_enhanced = query.config.use_enhanced;
    let want_vector = matches!(query.config.strategy, SearchStrategy::Vector | SearchStrategy::Hybrid);
    let want_lexical = use_enhanced
        && matches!(query.config.strategy, SearchStrategy::Bm25 | SearchStrategy::Hybrid);

    // Step 2: query embedding, with lexical-only fallback on failure.
    let embedding = if want_vector {
        match embedder.embed(&[focus_text.as_str()]).await {
            Ok(mut vectors) => vectors.pop(),
            Err(_) => {
                diagnostics.vector_degraded = true;
                None
            }
        }
    } else {
        None
    };

    if embedding.is_none() && !want_lexical {
        return Err(RetrievalError::EmbeddingUnavailable);
    }

    if cancel.is_cancelled() || deadline.is_expired() {
        return Err(RetrievalError::Timeout);
    }

    // Step 3: candidate retrieval, each branch bounded by RETRIEVAL_TIMEOUT
    // and the cumulative call deadline, whichever is tighter.
    let retrieval_timeout = deadline.bounded(cfg.retrieval_timeout());

    // Both branches are independent reads against different indices, so they
    // run concurrently rather than one blocking behind the other — a slow
    // BM25 refit must not eat into the vector branch's share of the
    // per-call deadline.
    let vector_future = async {
        if let Some(query_vec) = embedding.clone() {
            bounded_vector_search(store, query.user_id, query_vec, cfg.k_vec, retrieval_timeout).await
        } else {
            None
        }
    };
    let lexical_future = async {
        if want_lexical {
            bounded_lexical_search(
                store,
                query.user_id,
                focus_text.clone(),
                cfg.k_bm,
                retrieval_timeout,
                cfg.lexical_fit_max_docs,
            )
            .await
        } else {
            None
        }
    };
    let (vector_result, lexical_result) = tokio::join!(vector_future, lexical_future);

    let vector_hits = if embedding.is_some() {
        match vector_result {
            Some(hits) => hits,
            None => {
                diagnostics.hybrid_branch_timed_out = true;
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let lexical_hits = if want_lexical {
        match lexical_result {
            Some(Some(hits)) => hits,
            Some(None) => {
                diagnostics.lexical_degraded = true;
                Vec::new()
            }
            None => {
                diagnostics.hybrid_branch_timed_out = true;
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    if embedding.is_none() && lexical_hits.is_empty() && want_lexical {
        return Err(RetrievalError::EmbeddingUnavailable);
    }

    if cancel.is_cancelled() || deadline.is_expired() {
        return Err(RetrievalError::Timeout);
    }

    // Step 4: score fusion.
    let fused = fusion::fuse(&vector_hits, &lexical_hits, cfg.weight_vector, cfg.weight_bm25);

    // Step 5: pre-rerank trim.
    let mut candidates: Vec<fusion::FusedCandidate> = fused.into_iter().take(cfg.rerank_input_cap).collect();

    // Step 6: optional rerank.
    let use_reranking = cfg.enable_reranking && query.config.use_reranking && !candidates.is_empty();
    let mut rerank_scores: HashMap<ChunkId, f32> = HashMap::new();
    if use_reranking {
        let mut texts = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            if let Ok(Some(chunk)) = store.get_chunk(candidate.chunk_id).await {
                texts.push((candidate.chunk_id, chunk.text));
            }
        }
        let rerank_timeout = deadline.bounded(cfg.rerank_timeout());
        let mut rerank_failed = false;
        for batch in texts.chunks(cfg.rerank_batch.max(1)) {
            match tokio::time::timeout(rerank_timeout, reranker.score(&focus_text, batch)).await {
                Ok(Ok(scores)) => rerank_scores.extend(scores),
                _ => {
                    rerank_failed = true;
                    break;
                }
            }
        }
        if rerank_failed {
            rerank_scores.clear();
            diagnostics.rerank_skipped = true;
        }
    } else if query.config.use_reranking {
        diagnostics.rerank_skipped = true;
    }

    if !rerank_scores.is_empty() {
        candidates.sort_by(|a, b| {
            let sa = rerank_scores.get(&a.chunk_id).copied().unwrap_or(a.fused_score);
            let sb = rerank_scores.get(&b.chunk_id).copied().unwrap_or(b.fused_score);
            sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    if cancel.is_cancelled() || deadline.is_expired() {
        return Err(RetrievalError::Timeout);
    }

    // Step 7: paper-level aggregation.
    let mut per_paper: HashMap<PaperId, Vec<&fusion::FusedCandidate>> = HashMap::new();
    for candidate in &candidates {
        per_paper.entry(candidate.paper_id).or_default().push(candidate);
    }

    let paper_ids: Vec<PaperId> = per_paper.keys().copied().collect();
    let summaries = papers.get_many(&paper_ids).await;

    let now_year = confidence::current_year();
    let mut suggestions = Vec::with_capacity(per_paper.len());

    for (paper_id, mut parts) in per_paper {
        let Some(summary) = summaries.get(&paper_id) else {
            continue;
        };
        parts.truncate(cfg.max_chunks_per_paper);
        let Some(primary) = parts.first() else { continue };

        let chunk = match store.get_chunk(primary.chunk_id).await {
            Ok(Some(chunk)) => chunk,
            _ => continue,
        };

        let ranking_score_normalized = rerank_scores
            .get(&primary.chunk_id)
            .copied()
            .unwrap_or(primary.fused_score)
            .clamp(0.0, 1.0);

        let confidence = confidence::compose(
            &confidence::ConfidenceInputs {
                ranking_score_normalized,
                focus_text: &focus_text,
                chunk_text: &chunk.text,
                citation_count: summary.citation_count,
                year: summary.year,
            },
            now_year,
        );

        let display_text = match (summary.first_author_surname(), summary.year) {
            (Some(surname), Some(year)) if summary.authors.len() > 1 => {
                format!("({surname} et al., {year})")
            }
            (Some(surname), Some(year)) => format!("({surname}, {year})"),
            _ => format!("[{}]", paper_id.short_prefix()),
        };

        suggestions.push(Suggestion {
            paper_id,
            title: summary.title.clone(),
            authors: summary.authors.clone(),
            year: summary.year,
            confidence,
            citation_style: CitationStyle::Inline,
            display_text,
            chunk_id: chunk.id,
            chunk_preview: chunk.text.chars().take(280).collect(),
            chunk_section: chunk.section_label.clone(),
            chunk_ordinal: chunk.ordinal,
            page_span: chunk.page_span,
            scores: ChunkScores {
                vector: primary.vector_score,
                lexical: primary.lexical_score,
                fused: Some(primary.fused_score),
                rerank: rerank_scores.get(&primary.chunk_id).copied(),
            },
        });
    }

    // Step 9: suggestion assembly.
    suggestions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.scores
                    .vector
                    .unwrap_or(0.0)
                    .partial_cmp(&a.scores.vector.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| b.year.unwrap_or(0).cmp(&a.year.unwrap_or(0)))
            .then_with(|| a.title.cmp(&b.title))
    });
    suggestions.truncate(cfg.max_suggestions);

    Ok(Suggestions {
        items: suggestions,
        diagnostics,
    })
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchStrategy::Vector => "vector",
            SearchStrategy::Bm25 => "bm25",
            SearchStrategy::Hybrid => "hybrid",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_extraction_rejects_short_sentences() {
        let focus = FocusContext {
            current_sentence: "short".into(),
            ..Default::default()
        };
        assert!(extract_focus_text(&focus, 10).is_none());
    }

    #[test]
    fn focus_extraction_joins_surrounding_sentences() {
        let focus = FocusContext {
            current_sentence: "Transformers changed everything.".into(),
            previous_sentence: Some("Attention is powerful.".into()),
            next_sentence: Some("Many variants followed.".into()),
            ..Default::default()
        };
        let text = extract_focus_text(&focus, 10).unwrap();
        assert!(text.contains("Attention is powerful."));
        assert!(text.contains("Transformers changed everything."));
        assert!(text.contains("Many variants followed."));
    }
}
