//! Sentence-aware sliding-window chunker.
//!
//! Splits a paper's full text into overlapping word-budgeted windows that
//! respect sentence boundaries wherever possible, so a single chunk never
//! cuts a sentence in half except when one sentence alone exceeds the
//! configured maximum.
//!
//! ```rust
//! use citegraph_core::types::PaperId;
//! use citegraph_chunker::{chunk_paper, ChunkerConfig};
//!
//! let cfg = ChunkerConfig::default();
//! let chunks = chunk_paper(PaperId::new(), "First sentence. Second sentence. Third one.", &cfg).unwrap();
//! assert!(!chunks.is_empty());
//! ```

mod error;
mod segment;

pub use error::ChunkError;

use citegraph_core::types::{Chunk, PaperId};
use serde::{Deserialize, Serialize};

/// Tuning knobs for [`chunk_paper`] (spec.md §4.1, §6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    pub target_words: usize,
    pub overlap_words: usize,
    pub min_words: usize,
    pub max_words: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_words: 250,
            overlap_words: 50,
            min_words: 30,
            max_words: 500,
        }
    }
}

/// Splits `full_text` into the overlapping chunks of one paper.
///
/// Returns [`ChunkError::EmptyInput`] when the text contains no extractable
/// sentences, which the caller maps to [`citegraph_core::types::FailureReason::NoContent`].
pub fn chunk_paper(
    paper_id: PaperId,
    full_text: &str,
    cfg: &ChunkerConfig,
) -> Result<Vec<Chunk>, ChunkError> {
    let span = tracing::info_span!("chunker.chunk_paper", paper_id = %paper_id);
    let _guard = span.enter();
    let start = std::time::Instant::now();

    let sections = segment::split_sections(full_text);
    let mut sentence_count = 0usize;
    let mut windows: Vec<segment::RawWindow> = Vec::new();

    for section in &sections {
        let sentences = segment::split_sentences(&section.body);
        sentence_count += sentences.len();
        if sentences.is_empty() {
            continue;
        }
        segment::build_windows(&sentences, section.label.clone(), cfg, &mut windows);
    }

    if windows.is_empty() {
        tracing::warn!(paper_id = %paper_id, "chunker_no_content");
        return Err(ChunkError::EmptyInput);
    }

    segment::merge_short_trailing_windows(&mut windows, cfg.min_words, cfg.max_words);

    let chunks: Vec<Chunk> = windows
        .into_iter()
        .enumerate()
        .map(|(ordinal, w)| w.into_chunk(paper_id, ordinal as u32))
        .collect();

    tracing::info!(
        paper_id = %paper_id,
        sentence_count,
        chunk_count = chunks.len(),
        elapsed_micros = start.elapsed().as_micros() as u64,
        "chunker_chunk_paper_complete"
    );

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_fails() {
        let cfg = ChunkerConfig::default();
        let err = chunk_paper(PaperId::new(), "   \n\n  ", &cfg).unwrap_err();
        assert!(matches!(err, ChunkError::EmptyInput));
    }

    #[test]
    fn short_document_produces_single_chunk() {
        let cfg = ChunkerConfig::default();
        let chunks =
            chunk_paper(PaperId::new(), "This is one short sentence about graphs.", &cfg).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].ordinal, 0);
    }

    #[test]
    fn long_document_produces_overlapping_chunks() {
        let cfg = ChunkerConfig {
            target_words: 20,
            overlap_words: 5,
            min_words: 3,
            max_words: 30,
        };
        let sentence = "Graph neural networks learn representations over structured data. ";
        let text = sentence.repeat(30);
        let chunks = chunk_paper(PaperId::new(), &text, &cfg).unwrap();
        assert!(chunks.len() > 1);
        for w in chunks.windows(2) {
            assert_eq!(w[1].ordinal, w[0].ordinal + 1);
        }
    }

    #[test]
    fn ordinals_are_dense_from_zero() {
        let cfg = ChunkerConfig {
            target_words: 10,
            overlap_words: 2,
            min_words: 2,
            max_words: 15,
        };
        let text = "Word sentence number one. Word sentence number two. Word sentence number three. Word sentence number four. Word sentence number five.";
        let chunks = chunk_paper(PaperId::new(), text, &cfg).unwrap();
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.ordinal, i as u32);
        }
    }
}
