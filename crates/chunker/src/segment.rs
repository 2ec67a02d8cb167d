use crate::ChunkerConfig;
use citegraph_core::types::{sha256_hex, Chunk, ChunkId, PaperId};
use unicode_segmentation::UnicodeSegmentation;

pub struct Section {
    pub label: Option<String>,
    pub body: String,
}

/// Splits on blank lines; a one-line paragraph with few words and no
/// terminal punctuation is treated as a heading that labels the sections
/// following it, until the next heading.
pub fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current_label: Option<String> = None;
    let mut body = String::new();

    for paragraph in text.split("\n\n") {
        let trimmed = paragraph.trim();
        if trimmed.is_empty() {
            continue;
        }
        if looks_like_heading(trimmed) {
            if !body.trim().is_empty() {
                sections.push(Section {
                    label: current_label.clone(),
                    body: std::mem::take(&mut body),
                });
            }
            current_label = Some(trimmed.to_string());
            continue;
        }
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(trimmed);
    }
    if !body.trim().is_empty() {
        sections.push(Section {
            label: current_label,
            body,
        });
    }
    if sections.is_empty() && !text.trim().is_empty() {
        sections.push(Section {
            label: None,
            body: text.trim().to_string(),
        });
    }
    sections
}

fn looks_like_heading(paragraph: &str) -> bool {
    if paragraph.contains('\n') {
        return false;
    }
    let word_count = paragraph.split_whitespace().count();
    if word_count == 0 || word_count > 8 {
        return false;
    }
    !paragraph.ends_with(['.', '?', '!', ','])
}

/// Splits text into trimmed, non-empty sentences via Unicode sentence
/// boundaries.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn word_count(s: &str) -> u32 {
    s.split_whitespace().count() as u32
}

pub struct RawWindow {
    text: String,
    section_label: Option<String>,
    word_count: u32,
}

impl RawWindow {
    pub fn into_chunk(self, paper_id: PaperId, ordinal: u32) -> Chunk {
        let token_len = (self.word_count as f32 * 1.3).ceil() as u32;
        Chunk {
            id: ChunkId::new(),
            paper_id,
            ordinal,
            content_hash: sha256_hex(&self.text),
            word_count: self.word_count,
            token_len,
            section_label: self.section_label,
            page_span: None,
            embedding: None,
            created_at: chrono::Utc::now(),
            text: self.text,
        }
    }
}

struct WindowBuilder {
    sentences: Vec<(String, u32)>,
    word_total: u32,
    label: Option<String>,
}

impl WindowBuilder {
    fn new(label: Option<String>) -> Self {
        Self {
            sentences: Vec::new(),
            word_total: 0,
            label,
        }
    }

    fn push(&mut self, sentence: String, words: u32) {
        self.word_total += words;
        self.sentences.push((sentence, words));
    }

    fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    fn flush(self, out: &mut Vec<RawWindow>) -> Vec<(String, u32)> {
        if self.sentences.is_empty() {
            return self.sentences;
        }
        let text = self
            .sentences
            .iter()
            .map(|(s, _)| s.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        out.push(RawWindow {
            text,
            section_label: self.label,
            word_count: self.word_total,
        });
        self.sentences
    }
}

/// Trailing sentences of a just-flushed window, summing to at least
/// `overlap_words`, seeded into the next window.
fn seed_overlap(prior: &[(String, u32)], overlap_words: usize) -> Vec<(String, u32)> {
    let mut seed = Vec::new();
    let mut total = 0usize;
    for (sentence, words) in prior.iter().rev() {
        if total >= overlap_words {
            break;
        }
        seed.push((sentence.clone(), *words));
        total += *words as usize;
    }
    seed.reverse();
    seed
}

/// Builds sliding windows over one section's sentences, flushing at
/// `target_words`, keeping any single sentence longer than `max_words` as
/// its own unsplit chunk (spec.md §4.1: "without splitting"), and seeding
/// each new window with the overlap tail of the previous one.
pub fn build_windows(
    sentences: &[String],
    label: Option<String>,
    cfg: &ChunkerConfig,
    out: &mut Vec<RawWindow>,
) {
    let mut builder = WindowBuilder::new(label.clone());

    for sentence in sentences {
        let words = word_count(sentence);

        if words as usize > cfg.max_words {
            if !builder.is_empty() {
                builder.flush(out);
                builder = WindowBuilder::new(label.clone());
            }
            out.push(RawWindow {
                text: sentence.clone(),
                section_label: label.clone(),
                word_count: words,
            });
            continue;
        }

        if !builder.is_empty() && builder.word_total + words > cfg.max_words as u32 {
            let prior = builder.flush(out);
            builder = WindowBuilder::new(label.clone());
            for (s, w) in seed_overlap(&prior, cfg.overlap_words) {
                builder.push(s, w);
            }
        }

        builder.push(sentence.clone(), words);

        if builder.word_total >= cfg.target_words as u32 {
            let prior = builder.flush(out);
            builder = WindowBuilder::new(label.clone());
            for (s, w) in seed_overlap(&prior, cfg.overlap_words) {
                builder.push(s, w);
            }
        }
    }

    if !builder.is_empty() {
        builder.flush(out);
    }
}

/// Merges a trailing window that falls below `min_words` into its
/// predecessor, instead of emitting a too-short final chunk — unless doing
/// so would push the merged chunk past `max_words`, in which case the
/// trailing chunk stands on its own (spec.md §4.1 edge case).
pub fn merge_short_trailing_windows(windows: &mut Vec<RawWindow>, min_words: usize, max_words: usize) {
    if windows.len() < 2 {
        return;
    }
    let last = windows.last().unwrap();
    if (last.word_count as usize) >= min_words {
        return;
    }
    let prev = &windows[windows.len() - 2];
    if (prev.word_count + last.word_count) as usize > max_words {
        return;
    }
    let last = windows.pop().unwrap();
    let prev = windows.last_mut().unwrap();
    prev.text.push(' ');
    prev.text.push_str(&last.text);
    prev.word_count += last.word_count;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_detection_excludes_full_sentences() {
        assert!(looks_like_heading("Introduction"));
        assert!(looks_like_heading("2 Related Work"));
        assert!(!looks_like_heading(
            "This is a full sentence with more than eight words in it."
        ));
    }

    #[test]
    fn oversized_sentence_becomes_its_own_chunk_without_splitting() {
        let words: Vec<String> = (0..25).map(|i| i.to_string()).collect();
        let sentence = words.join(" ");
        let cfg = ChunkerConfig {
            target_words: 10,
            overlap_words: 2,
            min_words: 2,
            max_words: 10,
        };
        let mut out = Vec::new();
        build_windows(&[sentence.clone()], None, &cfg, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, sentence);
        assert_eq!(out[0].word_count, 25);
    }

    #[test]
    fn short_trailing_window_stands_alone_if_merge_would_exceed_max_words() {
        let mut windows = vec![
            RawWindow { text: "a".repeat(1).to_string(), section_label: None, word_count: 9 },
            RawWindow { text: "b".to_string(), section_label: None, word_count: 2 },
        ];
        merge_short_trailing_windows(&mut windows, 3, 10);
        assert_eq!(windows.len(), 2);
    }

    #[test]
    fn short_trailing_window_merges_when_it_fits() {
        let mut windows = vec![
            RawWindow { text: "a".to_string(), section_label: None, word_count: 5 },
            RawWindow { text: "b".to_string(), section_label: None, word_count: 2 },
        ];
        merge_short_trailing_windows(&mut windows, 3, 10);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].word_count, 7);
    }
}
