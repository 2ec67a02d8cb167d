use crate::circuit_breaker::CircuitBreakerConfig;
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which backend [`crate::build_embedder`] wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderMode {
    /// Deterministic hash-based vectors; always available, used in tests
    /// and as the guaranteed fallback.
    Stub,
    /// Local ONNX Runtime session, loaded once per process.
    Onnx,
    /// HTTP call to an OpenAI/HF-compatible embeddings endpoint. Ingestion
    /// only — never called on the query path.
    Remote,
}

/// Tuning knobs for the embedder (spec.md §4.2, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    pub mode: EmbedderMode,
    pub dimension: usize,
    pub normalize: bool,

    pub model_path: String,
    pub tokenizer_path: String,

    pub api_url: String,
    pub api_auth_header: Option<String>,
    #[serde(with = "crate::serde_millis")]
    pub api_timeout: Duration,

    pub cache_capacity: usize,

    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: RetryConfig,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            mode: EmbedderMode::Stub,
            dimension: 384,
            normalize: true,
            model_path: "models/bge-small-en-v1.5.onnx".to_string(),
            tokenizer_path: "models/bge-small-en-v1.5.tokenizer.json".to_string(),
            api_url: "https://api.openai.com/v1/embeddings".to_string(),
            api_auth_header: None,
            api_timeout: Duration::from_secs(10),
            cache_capacity: 10_000,
            circuit_breaker: CircuitBreakerConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}
