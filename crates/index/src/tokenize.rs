//! BM25 tokenization: lowercase, Unicode word boundaries, English stopword
//! removal, token length clamped to `[2, 30]` (spec.md §4.4).

use unicode_segmentation::UnicodeSegmentation;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "her", "his", "i", "if", "in", "into", "is", "it", "its", "of", "on", "or", "our", "she",
    "so", "that", "the", "their", "them", "then", "there", "these", "they", "this", "to", "was",
    "we", "were", "which", "who", "will", "with", "you",
];

pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(|w| w.to_lowercase())
        .filter(|w| {
            let len = w.chars().count();
            (2..=30).contains(&len) && !STOPWORDS.contains(&w.as_str())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_stopwords_and_short_tokens() {
        let tokens = tokenize("The quick brown fox is a dog.");
        assert!(!tokens.contains(&"the".to_string()));
        assert!(!tokens.contains(&"is".to_string()));
        assert!(!tokens.contains(&"a".to_string()));
        assert!(tokens.contains(&"quick".to_string()));
        assert!(tokens.contains(&"brown".to_string()));
    }

    #[test]
    fn lowercases_unicode_words() {
        let tokens = tokenize("GRAPH Networks");
        assert_eq!(tokens, vec!["graph", "networks"]);
    }
}
