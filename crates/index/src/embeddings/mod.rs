//! Embedding engine.
//!
//! Provides provider-agnostic embedding generation. `Embedder` is the one
//! entry point used by both the ingestion pipeline and the query service, so
//! the same truncation and shape checks apply on the write and read paths.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use semsearch_core::{AppError, AppResult};
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Shared embedder: a loaded provider plus its input limit.
#[derive(Debug, Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    max_input_tokens: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, max_input_tokens: usize) -> Self {
        Self {
            provider,
            max_input_tokens,
        }
    }

    /// Load the provider described by `config`.
    ///
    /// Fails with `AppError::ModelInit` when a remote model cannot be reached.
    pub async fn from_config(config: &EmbeddingConfig) -> AppResult<Self> {
        let provider = create_provider(config).await?;

        tracing::info!(
            "Loaded embedding provider '{}' (model: {}, dimensions: {})",
            provider.provider_name(),
            provider.model_name(),
            provider.dimensions()
        );

        Ok(Self::new(provider, config.max_input_tokens))
    }

    pub fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed `text`, truncated to the configured number of words.
    pub async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let input = truncate_to_tokens(text, self.max_input_tokens);
        if input.len() < text.len() {
            tracing::trace!(
                "Truncated input from {} to {} bytes",
                text.len(),
                input.len()
            );
        }

        let embedding = self.provider.embed(input).await?;

        if embedding.len() != self.provider.dimensions() {
            return Err(AppError::Embedding(format!(
                "Provider '{}' returned {} dimensions, expected {}",
                self.provider.provider_name(),
                embedding.len(),
                self.provider.dimensions()
            )));
        }

        // Cosine similarity is undefined for a zero vector.
        if embedding.iter().all(|&x| x == 0.0) {
            return Err(AppError::Embedding(format!(
                "Provider '{}' produced a zero vector",
                self.provider.provider_name()
            )));
        }

        Ok(embedding)
    }
}

/// Cut `text` after `max_tokens` words.
///
/// Words are Unicode word-boundary segments that are not whitespace, so the
/// cut always lands on a segment boundary and the same input always yields
/// the same prefix. Text within the limit is returned unchanged.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> &str {
    let mut tokens = 0usize;
    for (offset, segment) in text.split_word_bound_indices() {
        if segment.trim().is_empty() {
            continue;
        }
        if tokens == max_tokens {
            return text[..offset].trim_end();
        }
        tokens += 1;
    }
    text
}
