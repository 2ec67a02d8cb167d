use crate::circuit_breaker::CircuitBreaker;
use crate::retry::RetryConfig;
use crate::stub::l2_normalize;
use crate::{EmbedError, Embedder, EmbedderConfig};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// HTTP embedding backend for an OpenAI/HF-compatible `/embeddings`
/// endpoint, guarded by a circuit breaker and exponential-backoff retry so
/// a flaky remote provider never stalls ingestion indefinitely.
///
/// Ingestion-time only (spec.md §4.2 Non-goals) — never constructed for the
/// query path.
pub struct RemoteEmbedder {
    client: reqwest::Client,
    cfg: EmbedderConfig,
    breaker: CircuitBreaker,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl RemoteEmbedder {
    pub fn new(cfg: EmbedderConfig) -> Result<Self, EmbedError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.api_timeout)
            .build()
            .map_err(|e| EmbedError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            breaker: CircuitBreaker::new(cfg.circuit_breaker),
            client,
            cfg,
        })
    }

    async fn call_once(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut request = self.client.post(&self.cfg.api_url).json(&json!({
            "input": texts,
        }));
        if let Some(header) = &self.cfg.api_auth_header {
            request = request.header("Authorization", header);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbedError::Remote(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbedError::Remote(format!(
                "embeddings endpoint returned {}",
                response.status()
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Remote(e.to_string()))?;

        let mut vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();
        if self.cfg.normalize {
            for vector in &mut vectors {
                l2_normalize(vector);
            }
        }
        Ok(vectors)
    }

    async fn call_with_retry(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let retry: RetryConfig = self.cfg.retry;
        let mut last_err = None;

        for attempt in 0..=retry.max_retries {
            if attempt > 0 {
                tokio::time::sleep(retry.calculate_delay(attempt)).await;
            }
            match self.call_once(texts).await {
                Ok(vectors) => {
                    self.breaker.record_success();
                    return Ok(vectors);
                }
                Err(e) => {
                    self.breaker.record_failure();
                    tracing::warn!(attempt, error = %e, "remote_embedder_attempt_failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or(EmbedError::Remote("exhausted retries".into())))
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if !self.breaker.allow_request() {
            return Err(EmbedError::CircuitOpen {
                provider: self.cfg.api_url.clone(),
            });
        }
        let timeout = self.cfg.api_timeout.max(Duration::from_secs(1));
        tokio::time::timeout(timeout, self.call_with_retry(texts))
            .await
            .map_err(|_| EmbedError::Timeout)?
    }

    fn dimension(&self) -> usize {
        self.cfg.dimension
    }
}
