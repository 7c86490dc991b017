//! Remote HTTP embedding provider.
//!
//! Implements [`EmbeddingProvider`] against an OpenAI-compatible
//! `/embeddings` endpoint. Requests carry a bounded timeout; every transport
//! or protocol failure maps to [`MemoryError::Embedding`] so callers can
//! decide between surfacing and degrading.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{l2_normalize, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::{MemoryError, Result};

/// OpenAI-compatible embeddings client.
pub struct RemoteEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
    api_key: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl RemoteEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            anyhow::anyhow!(
                "embedding API key not found — set the {} environment variable",
                config.api_key_env
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        tracing::info!(
            model = %config.model,
            dimensions = config.dimensions,
            "remote embedding provider ready"
        );

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            api_key,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(MemoryError::Embedding("cannot embed empty text".into()));
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "dimensions": self.dimensions,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MemoryError::Embedding(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MemoryError::Embedding(format!(
                "provider returned HTTP {status}: {detail}"
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::Embedding(format!("malformed response: {e}")))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| MemoryError::Embedding("response contained no embedding".into()))?;

        if embedding.len() != self.dimensions {
            return Err(MemoryError::Embedding(format!(
                "expected {} dimensions, provider returned {}",
                self.dimensions,
                embedding.len()
            )));
        }

        Ok(l2_normalize(&embedding))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(api_key_env: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            api_key_env: api_key_env.into(),
            ..Default::default()
        }
    }

    #[test]
    fn new_fails_without_api_key() {
        let result = RemoteEmbeddingProvider::new(&test_config("ENGRAM_TEST_KEY_UNSET"));
        assert!(result.is_err());
    }

    #[test]
    fn new_reads_key_from_configured_env_var() {
        std::env::set_var("ENGRAM_TEST_KEY_PRESENT", "sk-test");
        let provider = RemoteEmbeddingProvider::new(&test_config("ENGRAM_TEST_KEY_PRESENT")).unwrap();
        assert_eq!(provider.dimensions(), 1536);
        std::env::remove_var("ENGRAM_TEST_KEY_PRESENT");
    }

    #[test]
    fn response_shape_parses() {
        let json = r#"{"data": [{"embedding": [0.1, 0.2, 0.3]}], "model": "text-embedding-3-small"}"#;
        let parsed: EmbeddingsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data[0].embedding.len(), 3);
    }
}
