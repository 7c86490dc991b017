//! Text-to-vector embedding via an external provider.
//!
//! Provides the [`EmbeddingProvider`] trait and the remote HTTP
//! implementation. Providers return L2-normalized vectors of a fixed
//! dimension so cosine similarity can be derived from vec0 L2 distances.

pub mod remote;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for embedding text into vectors.
///
/// Implementations produce L2-normalized vectors of exactly `dimensions()`
/// width. Embedding is a network call and may fail with
/// [`MemoryError::Embedding`](crate::error::MemoryError::Embedding); callers
/// on best-effort paths degrade rather than propagate.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;
}

/// Create an embedding provider from config.
///
/// Currently only `"remote"` is supported (OpenAI-compatible HTTP API).
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> anyhow::Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "remote" => {
            let provider = remote::RemoteEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: remote"),
    }
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
pub(crate) fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
