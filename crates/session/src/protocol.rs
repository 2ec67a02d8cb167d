//! Wire messages for the streaming session channel (spec.md §6).
//!
//! Tagged on `type`/`action` the way the legalis teacher's
//! `WsClientMessage`/`WsServerMessage` are, with field names kept camelCase
//! to match the JSON contract rather than this crate's Rust conventions.

use citegraph_core::types::{ChunkId, PageSpan, PaperId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct FocusContextWire {
    #[serde(rename = "currentSentence")]
    pub current_sentence: String,
    #[serde(rename = "previousSentence")]
    pub previous_sentence: Option<String>,
    #[serde(rename = "nextSentence")]
    pub next_sentence: Option<String>,
    pub paragraph: Option<String>,
    #[serde(rename = "cursorPosition")]
    pub cursor_position: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreferencesWire {
    #[serde(rename = "useEnhanced")]
    pub use_enhanced: Option<bool>,
    #[serde(rename = "useReranking")]
    pub use_reranking: Option<bool>,
    #[serde(rename = "searchStrategy")]
    pub search_strategy: Option<String>,
}

/// Inbound message, tagged on `action` (spec.md §6 table).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Suggest {
        text: String,
        context: FocusContextWire,
    },
    UpdatePreferences {
        preferences: PreferencesWire,
    },
    Ping,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionWire {
    #[serde(rename = "paperId")]
    pub paper_id: PaperId,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub confidence: f32,
    #[serde(rename = "displayText")]
    pub display_text: String,
    #[serde(rename = "chunkId")]
    pub chunk_id: ChunkId,
    #[serde(rename = "chunkPreview")]
    pub chunk_preview: String,
    #[serde(rename = "chunkSection")]
    pub chunk_section: Option<String>,
    #[serde(rename = "pageSpan")]
    pub page_span: Option<PageSpan>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct DiagnosticsWire {
    #[serde(rename = "vectorDegraded")]
    pub vector_degraded: bool,
    #[serde(rename = "lexicalDegraded")]
    pub lexical_degraded: bool,
    #[serde(rename = "rerankSkipped")]
    pub rerank_skipped: bool,
}

/// Outbound message, tagged on `type` (spec.md §6 table).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Suggestions {
        results: Vec<SuggestionWire>,
        diagnostics: DiagnosticsWire,
    },
    Error {
        code: &'static str,
        message: String,
    },
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_message_parses_camel_case_context() {
        let json = r#"{"action":"suggest","text":"transformers","context":{"currentSentence":"x"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Suggest { text, context } => {
                assert_eq!(text, "transformers");
                assert_eq!(context.current_sentence, "x");
            }
            _ => panic!("expected Suggest"),
        }
    }

    #[test]
    fn ping_message_has_no_payload() {
        let msg: ClientMessage = serde_json::from_str(r#"{"action":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn pong_serializes_with_type_tag() {
        let json = serde_json::to_string(&ServerMessage::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }
}
