//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use semsearch_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// A provider is loaded once at process start and shared by the ingestion
/// pipeline and the query service.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "ollama", "trigram")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate the embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}

/// Create an embedding provider based on configuration.
///
/// Remote providers are contacted here so that an unreachable or misnamed
/// model fails the process before any index is touched.
pub async fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    config.validate()?;

    match config.provider.as_str() {
        "ollama" => {
            let provider = super::providers::ollama::OllamaProvider::new(config).await?;
            Ok(Arc::new(provider))
        }

        "trigram" => {
            if config.model != super::providers::trigram::TRIGRAM_MODEL {
                tracing::debug!(
                    "Ignoring model '{}' for trigram provider (always {})",
                    config.model,
                    super::providers::trigram::TRIGRAM_MODEL
                );
            }
            let provider = super::providers::trigram::TrigramProvider::new(config.dimensions);
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, trigram",
            config.provider
        ))),
    }
}
