//! Five-factor confidence composition (spec.md §4.6 step 8).
//!
//! Each factor is clamped to `[0, 1]` *before* weighting; the weight vector
//! is the only source of inter-factor balance (an explicit invariant the
//! spec calls out after noting the source implementation occasionally
//! produced confidence values above 1.0 by skipping this clamp).

use chrono::Datelike;
use std::collections::HashSet;

const WEIGHT_SIMILARITY: f32 = 0.40;
const WEIGHT_CONTEXT: f32 = 0.25;
const WEIGHT_QUALITY: f32 = 0.15;
const WEIGHT_RECENCY: f32 = 0.10;
const WEIGHT_PREFERENCE: f32 = 0.10;

/// Placeholder until a user-preference signal exists; the weight stays
/// fixed so wiring in real preferences later does not rebalance the other
/// four factors.
const USER_PREFERENCE_PLACEHOLDER: f32 = 0.5;

fn jaccard_word_overlap(a: &str, b: &str) -> f32 {
    let words_a: HashSet<String> = a.split_whitespace().map(|w| w.to_lowercase()).collect();
    let words_b: HashSet<String> = b.split_whitespace().map(|w| w.to_lowercase()).collect();
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count() as f32;
    let union = words_a.union(&words_b).count() as f32;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

fn paper_quality(citation_count: Option<u64>) -> f32 {
    match citation_count {
        Some(count) => (((1.0 + count as f32).log10()) / 4.0).min(1.0),
        None => 0.3,
    }
}

fn recency(year: Option<i32>, now_year: i32) -> f32 {
    match year {
        Some(year) => {
            let y0 = now_year - 10;
            let span = (now_year - y0) as f32;
            ((year - y0) as f32 / span).clamp(0.0, 1.0)
        }
        None => 0.3,
    }
}

/// Inputs to [`compose`], one per candidate's primary chunk.
pub struct ConfidenceInputs<'a> {
    pub ranking_score_normalized: f32,
    pub focus_text: &'a str,
    pub chunk_text: &'a str,
    pub citation_count: Option<u64>,
    pub year: Option<i32>,
}

/// Composes the final `[0, 1]` confidence. `now_year` is injected so the
/// recency factor stays deterministic for tests.
pub fn compose(inputs: &ConfidenceInputs<'_>, now_year: i32) -> f32 {
    let similarity = inputs.ranking_score_normalized.clamp(0.0, 1.0);
    let context = jaccard_word_overlap(inputs.focus_text, inputs.chunk_text).clamp(0.0, 1.0);
    let quality = paper_quality(inputs.citation_count).clamp(0.0, 1.0);
    let rec = recency(inputs.year, now_year).clamp(0.0, 1.0);
    let preference = USER_PREFERENCE_PLACEHOLDER.clamp(0.0, 1.0);

    (WEIGHT_SIMILARITY * similarity
        + WEIGHT_CONTEXT * context
        + WEIGHT_QUALITY * quality
        + WEIGHT_RECENCY * rec
        + WEIGHT_PREFERENCE * preference)
        .clamp(0.0, 1.0)
}

pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let total = WEIGHT_SIMILARITY + WEIGHT_CONTEXT + WEIGHT_QUALITY + WEIGHT_RECENCY + WEIGHT_PREFERENCE;
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn perfect_similarity_and_overlap_with_unknown_metadata_is_below_one() {
        let inputs = ConfidenceInputs {
            ranking_score_normalized: 1.0,
            focus_text: "transformer architectures",
            chunk_text: "transformer architectures",
            citation_count: None,
            year: None,
        };
        let confidence = compose(&inputs, 2026);
        assert!(confidence > 0.0 && confidence < 1.0);
    }

    #[test]
    fn recent_year_scores_higher_than_decade_old() {
        let base = ConfidenceInputs {
            ranking_score_normalized: 0.5,
            focus_text: "a b c",
            chunk_text: "a b c",
            citation_count: Some(10),
            year: Some(2025),
        };
        let old = ConfidenceInputs {
            year: Some(2010),
            ..base
        };
        assert!(compose(&base, 2026) > compose(&old, 2026));
    }

    #[test]
    fn monotone_non_decreasing_in_similarity() {
        let low = ConfidenceInputs {
            ranking_score_normalized: 0.1,
            focus_text: "x",
            chunk_text: "y",
            citation_count: Some(1),
            year: Some(2020),
        };
        let high = ConfidenceInputs {
            ranking_score_normalized: 0.9,
            ..low
        };
        assert!(compose(&high, 2026) >= compose(&low, 2026));
    }
}
