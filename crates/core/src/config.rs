//! Environment configuration, loaded the way the teacher's `ServerConfig`
//! is: a layered `config::Config` builder (optional file, then environment
//! variables with a service prefix) plus `dotenvy` for local development.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_embedding_model_path() -> String {
    "models/bge-small-en-v1.5.onnx".to_string()
}
fn default_embedding_cache_capacity() -> usize {
    10_000
}
fn default_chunk_target_words() -> usize {
    250
}
fn default_chunk_overlap_words() -> usize {
    50
}
fn default_chunk_min_words() -> usize {
    30
}
fn default_chunk_max_words() -> usize {
    500
}
fn default_k_vec() -> usize {
    30
}
fn default_k_bm() -> usize {
    30
}
fn default_weight_vector() -> f32 {
    0.6
}
fn default_weight_bm25() -> f32 {
    0.4
}
fn default_rerank_input_cap() -> usize {
    20
}
fn default_rerank_batch() -> usize {
    64
}
fn default_max_chunks_per_paper() -> usize {
    2
}
fn default_max_suggestions() -> usize {
    15
}
fn default_retrieval_timeout_secs() -> u64 {
    10
}
fn default_rerank_timeout_secs() -> u64 {
    10
}
fn default_lexical_fit_max_docs() -> usize {
    10_000
}
fn default_lexical_fit_timeout_secs() -> u64 {
    15
}
fn default_rate_limit_per_minute() -> u32 {
    60
}
fn default_rate_limit_burst() -> u32 {
    10
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_idle_ping_secs() -> u64 {
    30
}
fn default_ping_timeout_secs() -> u64 {
    5
}
fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_data_dir() -> String {
    "./data".to_string()
}
fn default_min_vectors_for_ann() -> usize {
    1000
}
fn default_min_query_chars() -> usize {
    10
}
fn default_rerank_model_path() -> String {
    "models/ms-marco-minilm-l6.onnx".to_string()
}
fn default_rerank_tokenizer_path() -> String {
    "models/ms-marco-minilm-l6.tokenizer.json".to_string()
}
fn default_rerank_max_sequence_len() -> usize {
    256
}

/// Every knob listed in spec.md §6, loaded once at process start.
///
/// Layering mirrors `crates/server/src/config.rs`: an optional
/// `citegraph.toml` file, overridden by `CITEGRAPH__`-prefixed environment
/// variables (double underscore as the nesting separator), overridden in
/// turn by a local `.env` file loaded via `dotenvy` before the builder runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    #[serde(default = "default_embedding_model_path")]
    pub embedding_model_path: String,
    #[serde(default = "default_embedding_cache_capacity")]
    pub embedding_cache_capacity: usize,

    #[serde(default = "default_chunk_target_words")]
    pub chunk_target_words: usize,
    #[serde(default = "default_chunk_overlap_words")]
    pub chunk_overlap_words: usize,
    #[serde(default = "default_chunk_min_words")]
    pub chunk_min_words: usize,
    #[serde(default = "default_chunk_max_words")]
    pub chunk_max_words: usize,

    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,

    #[serde(default = "default_k_vec")]
    pub k_vec: usize,
    #[serde(default = "default_k_bm")]
    pub k_bm: usize,
    #[serde(default = "default_weight_vector")]
    pub weight_vector: f32,
    #[serde(default = "default_weight_bm25")]
    pub weight_bm25: f32,

    #[serde(default = "default_rerank_input_cap")]
    pub rerank_input_cap: usize,
    #[serde(default = "default_rerank_batch")]
    pub rerank_batch: usize,
    #[serde(default = "default_max_chunks_per_paper")]
    pub max_chunks_per_paper: usize,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,

    #[serde(default = "default_retrieval_timeout_secs")]
    pub retrieval_timeout_secs: u64,
    #[serde(default = "default_rerank_timeout_secs")]
    pub rerank_timeout_secs: u64,
    #[serde(default = "default_lexical_fit_max_docs")]
    pub lexical_fit_max_docs: usize,
    #[serde(default = "default_lexical_fit_timeout_secs")]
    pub lexical_fit_timeout_secs: u64,

    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    #[serde(default = "default_rate_limit_burst")]
    pub rate_limit_burst: u32,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_idle_ping_secs")]
    pub idle_ping_secs: u64,
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,

    #[serde(default = "default_min_vectors_for_ann")]
    pub min_vectors_for_ann: usize,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub enable_reranking: bool,
    #[serde(default = "default_rerank_model_path")]
    pub rerank_model_path: String,
    #[serde(default = "default_rerank_tokenizer_path")]
    pub rerank_tokenizer_path: String,
    #[serde(default = "default_rerank_max_sequence_len")]
    pub rerank_max_sequence_len: usize,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            embedding_model_path: default_embedding_model_path(),
            embedding_cache_capacity: default_embedding_cache_capacity(),
            min_query_chars: default_min_query_chars(),
            chunk_target_words: default_chunk_target_words(),
            chunk_overlap_words: default_chunk_overlap_words(),
            chunk_min_words: default_chunk_min_words(),
            chunk_max_words: default_chunk_max_words(),
            k_vec: default_k_vec(),
            k_bm: default_k_bm(),
            weight_vector: default_weight_vector(),
            weight_bm25: default_weight_bm25(),
            rerank_input_cap: default_rerank_input_cap(),
            rerank_batch: default_rerank_batch(),
            max_chunks_per_paper: default_max_chunks_per_paper(),
            max_suggestions: default_max_suggestions(),
            retrieval_timeout_secs: default_retrieval_timeout_secs(),
            rerank_timeout_secs: default_rerank_timeout_secs(),
            lexical_fit_max_docs: default_lexical_fit_max_docs(),
            lexical_fit_timeout_secs: default_lexical_fit_timeout_secs(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            rate_limit_burst: default_rate_limit_burst(),
            debounce_ms: default_debounce_ms(),
            idle_ping_secs: default_idle_ping_secs(),
            ping_timeout_secs: default_ping_timeout_secs(),
            min_vectors_for_ann: default_min_vectors_for_ann(),
            bind_addr: default_bind_addr(),
            port: default_port(),
            log_level: default_log_level(),
            data_dir: default_data_dir(),
            enable_reranking: false,
            rerank_model_path: default_rerank_model_path(),
            rerank_tokenizer_path: default_rerank_tokenizer_path(),
            rerank_max_sequence_len: default_rerank_max_sequence_len(),
        }
    }
}

impl EnvConfig {
    /// Loads configuration from (in increasing precedence) an optional
    /// `citegraph.toml` in the working directory, a `.env` file, and
    /// `CITEGRAPH__`-prefixed environment variables.
    pub fn load() -> Result<Self, crate::error::ConfigError> {
        let _ = dotenvy::dotenv();

        let raw = config::Config::builder()
            .add_source(config::File::with_name("citegraph").required(false))
            .add_source(config::Environment::with_prefix("CITEGRAPH").separator("__"))
            .build()
            .map_err(|e| crate::error::ConfigError::Config(e.to_string()))?;

        raw.try_deserialize()
            .map_err(|e| crate::error::ConfigError::Config(e.to_string()))
    }

    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval_timeout_secs)
    }
    pub fn rerank_timeout(&self) -> Duration {
        Duration::from_secs(self.rerank_timeout_secs)
    }
    pub fn lexical_fit_timeout(&self) -> Duration {
        Duration::from_secs(self.lexical_fit_timeout_secs)
    }
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
    pub fn idle_ping(&self) -> Duration {
        Duration::from_secs(self.idle_ping_secs)
    }
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let cfg = EnvConfig::default();
        assert_eq!(cfg.rate_limit_per_minute, 60);
        assert_eq!(cfg.rate_limit_burst, 10);
        assert_eq!(cfg.debounce_ms, 300);
        assert_eq!(cfg.max_suggestions, 15);
        assert_eq!(cfg.max_chunks_per_paper, 2);
        assert_eq!(cfg.rerank_input_cap, 20);
        assert_eq!(cfg.chunk_min_words, 30);
        assert_eq!(cfg.chunk_max_words, 500);
        assert_eq!(cfg.k_vec, 30);
        assert_eq!(cfg.k_bm, 30);
        assert!((cfg.weight_vector + cfg.weight_bm25 - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn socket_addr_combines_bind_and_port() {
        let cfg = EnvConfig::default();
        assert_eq!(cfg.socket_addr(), "0.0.0.0:8080");
    }
}
