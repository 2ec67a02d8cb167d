//! Workspace umbrella crate for CiteGraph, a real-time citation
//! recommendation engine.
//!
//! `citegraph` wires the chunking, embedding, indexing and reranking stages
//! into one ingestion entry point, [`ingest_paper`], and re-exports the
//! workspace crates so applications can depend on a single crate. The
//! retrieval side (`suggest`) and the session transport live in
//! [`citegraph_pipeline`] and [`citegraph_session`] respectively; this crate
//! owns the write path and the shared data model.
//!
//! ## Quick start
//!
//! ```ignore
//! use citegraph::{ingest_paper, types::{Paper, UserId}, EnvConfig};
//! use std::sync::Arc;
//!
//! # async fn demo(
//! #     store: Arc<citegraph_index::Store>,
//! #     embedder: Arc<dyn citegraph_embedder::Embedder>,
//! # ) -> Result<(), citegraph::PipelineError> {
//! let cfg = EnvConfig::default();
//! let mut paper = Paper::new(UserId(uuid::Uuid::new_v4()), "Attention Is All You Need");
//! let full_text = "...".to_string();
//! ingest_paper(&mut paper, full_text, &store, embedder.as_ref(), &cfg).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Observability
//!
//! Latency and structured events can be captured by installing a
//! [`PipelineMetrics`] recorder via [`set_pipeline_metrics`] and/or a
//! [`PipelineEventLogger`] with [`set_pipeline_logger`]. Both hooks receive
//! the `paper_id` and the concrete stage outcome, so a server process can
//! attach histograms and structured logs without threading a handle through
//! every call in the ingestion path.
//!
//! ## Errors
//!
//! Failures from any stage converge on [`PipelineError`], which records the
//! [`types::FailureReason`] that should be persisted on the paper (spec §7).

pub mod error;

pub use citegraph_core::config;
pub use citegraph_core::types;
pub use citegraph_core::EnvConfig;
pub use error::PipelineError;

#[cfg(feature = "embedded")]
use citegraph_chunker::ChunkerConfig;
#[cfg(feature = "embedded")]
use citegraph_embedder::Embedder;
#[cfg(feature = "embedded")]
use citegraph_index::Store;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::{Duration, Instant};
use types::{FailureReason, Paper};

/// Metrics observer for ingestion stages.
pub trait PipelineMetrics: Send + Sync {
    fn record_chunk(&self, latency: Duration, result: Result<(), ()>);
    fn record_embed(&self, latency: Duration, result: Result<(), ()>);
    fn record_index_write(&self, latency: Duration, result: Result<(), ()>);
}

/// Stage captured in an observability event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Chunk,
    Embed,
    IndexWrite,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Chunk => "chunk",
            PipelineStage::Embed => "embed",
            PipelineStage::IndexWrite => "index_write",
        };
        f.write_str(name)
    }
}

/// Outcome of an ingestion stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEventStatus {
    Success,
    Failure,
}

impl fmt::Display for PipelineEventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineEventStatus::Success => "success",
            PipelineEventStatus::Failure => "failure",
        };
        f.write_str(label)
    }
}

/// Structured observation describing the outcome of an ingestion stage.
#[derive(Debug, Clone)]
pub struct PipelineEvent {
    pub stage: PipelineStage,
    pub status: PipelineEventStatus,
    pub latency: Duration,
    pub paper_id: String,
    pub error: Option<String>,
}

impl PipelineEvent {
    fn format_key_values(&self) -> String {
        let mut parts = vec![
            format!("stage={}", self.stage),
            format!("status={}", self.status),
            format!("latency_us={}", self.latency.as_micros()),
            format!("paper_id=\"{}\"", self.paper_id),
        ];
        if let Some(error) = &self.error {
            parts.push(format!("error=\"{}\"", error.replace('"', "\\\"")));
        }
        parts.join(" ")
    }
}

/// Hook for emitting structured events per ingestion stage.
pub trait PipelineEventLogger: Send + Sync {
    fn log(&self, event: &PipelineEvent);
}

/// Key-value logger that writes structured events to any writer.
pub struct KeyValueLogger {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl KeyValueLogger {
    pub fn stdout() -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(io::stdout()))),
        }
    }
}

impl PipelineEventLogger for KeyValueLogger {
    fn log(&self, event: &PipelineEvent) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", event.format_key_values());
        }
    }
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

/// Install or clear the global ingestion metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    *metrics_lock().write().expect("metrics lock poisoned") = recorder;
}

fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    metrics_lock()
        .read()
        .unwrap_or_else(|p| p.into_inner())
        .clone()
}

fn logger_lock() -> &'static RwLock<Option<Arc<dyn PipelineEventLogger>>> {
    static LOGGER: OnceLock<RwLock<Option<Arc<dyn PipelineEventLogger>>>> = OnceLock::new();
    LOGGER.get_or_init(|| RwLock::new(None))
}

/// Install or clear the global ingestion event logger.
pub fn set_pipeline_logger(logger: Option<Arc<dyn PipelineEventLogger>>) {
    *logger_lock().write().expect("logger lock poisoned") = logger;
}

fn pipeline_logger() -> Option<Arc<dyn PipelineEventLogger>> {
    logger_lock()
        .read()
        .unwrap_or_else(|p| p.into_inner())
        .clone()
}

fn emit(stage: PipelineStage, paper_id: &str, start: Instant, error: Option<&str>) {
    let latency = start.elapsed();
    let ok = error.is_none();
    if let Some(m) = metrics_recorder() {
        match stage {
            PipelineStage::Chunk => m.record_chunk(latency, if ok { Ok(()) } else { Err(()) }),
            PipelineStage::Embed => m.record_embed(latency, if ok { Ok(()) } else { Err(()) }),
            PipelineStage::IndexWrite => {
                m.record_index_write(latency, if ok { Ok(()) } else { Err(()) })
            }
        }
    }
    if let Some(l) = pipeline_logger() {
        l.log(&PipelineEvent {
            stage,
            status: if ok {
                PipelineEventStatus::Success
            } else {
                PipelineEventStatus::Failure
            },
            latency,
            paper_id: paper_id.to_string(),
            error: error.map(str::to_string),
        });
    }
}

/// Drives one paper through `pending -> processing -> {indexed | failed}`
/// (spec.md §4.6, §7): chunk the full text, embed every chunk, then write
/// chunks and vectors into the durable store in one transaction so a
/// reader never observes a partially-indexed paper.
///
/// On any stage failure the paper is marked `failed` with the matching
/// [`types::FailureReason`] and the error is returned; the paper itself is
/// never left in `processing`.
#[cfg(feature = "embedded")]
pub async fn ingest_paper(
    paper: &mut Paper,
    full_text: String,
    store: &Store,
    embedder: &dyn Embedder,
    cfg: &EnvConfig,
) -> Result<(), PipelineError> {
    paper.mark_processing();
    let paper_id = paper.id.to_string();

    let result = ingest_paper_inner(paper, full_text, store, embedder, cfg).await;

    match result {
        Ok(chunk_count) => {
            paper.mark_indexed(chunk_count);
            Ok(())
        }
        Err(err) => {
            let reason = err.failure_reason().unwrap_or(FailureReason::IndexWriteFailed);
            paper.mark_failed(reason);
            tracing::warn!(paper_id = %paper_id, error = %err, "paper_ingestion_failed");
            Err(err)
        }
    }
}

#[cfg(feature = "embedded")]
async fn ingest_paper_inner(
    paper: &Paper,
    full_text: String,
    store: &Store,
    embedder: &dyn Embedder,
    cfg: &EnvConfig,
) -> Result<usize, PipelineError> {
    let paper_id_str = paper.id.to_string();

    let chunk_cfg = ChunkerConfig {
        target_words: cfg.chunk_target_words,
        overlap_words: cfg.chunk_overlap_words,
        min_words: cfg.chunk_min_words,
        max_words: cfg.chunk_max_words,
    };

    let start = Instant::now();
    let chunk_result = citegraph_chunker::chunk_paper(paper.id, &full_text, &chunk_cfg);
    let mut chunks = match chunk_result {
        Ok(chunks) if !chunks.is_empty() => {
            emit(PipelineStage::Chunk, &paper_id_str, start, None);
            chunks
        }
        Ok(_) => {
            emit(
                PipelineStage::Chunk,
                &paper_id_str,
                start,
                Some("no chunks produced"),
            );
            return Err(PipelineError::NoContent);
        }
        Err(e) => {
            emit(PipelineStage::Chunk, &paper_id_str, start, Some(&e.to_string()));
            return Err(PipelineError::Chunking(e));
        }
    };

    let start = Instant::now();
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    match embedder.embed(&texts).await {
        Ok(vectors) => {
            emit(PipelineStage::Embed, &paper_id_str, start, None);
            for (chunk, vector) in chunks.iter_mut().zip(vectors) {
                chunk.embedding = Some(vector);
            }
        }
        Err(e) => {
            emit(PipelineStage::Embed, &paper_id_str, start, Some(&e.to_string()));
            return Err(PipelineError::Embedding(e));
        }
    }

    let start = Instant::now();
    let chunk_count = chunks.len();
    match store.write_paper_chunks(paper.owner_id, paper.id, &chunks).await {
        Ok(()) => {
            emit(PipelineStage::IndexWrite, &paper_id_str, start, None);
            Ok(chunk_count)
        }
        Err(e) => {
            emit(PipelineStage::IndexWrite, &paper_id_str, start, Some(&e.to_string()));
            Err(PipelineError::Index(e))
        }
    }
}

/// Cascades the deletion of a paper and all of its chunks from the durable
/// store (spec.md §6, `DELETE /api/v1/papers/:id`).
#[cfg(feature = "embedded")]
pub async fn delete_paper(
    paper_id: types::PaperId,
    store: &Store,
) -> Result<(), PipelineError> {
    store
        .delete_paper(paper_id)
        .await
        .map_err(PipelineError::Index)
}
