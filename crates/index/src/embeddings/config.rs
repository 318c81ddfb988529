//! Embedding configuration shared by ingestion and query.

use semsearch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Embedding configuration.
///
/// Ingestion and query must be started with the same values; the index
/// records provider, model and dimensions so a mismatch is caught at query
/// start instead of silently returning unrelated neighbors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "ollama", "trigram"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding vector dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Inputs are cut to this many words before embedding
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,

    /// Provider endpoint (e.g. `http://localhost:11434` for Ollama)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-request timeout for remote providers
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_dimensions() -> usize {
    768
}

fn default_max_input_tokens() -> usize {
    512
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dimensions: default_dimensions(),
            max_input_tokens: default_max_input_tokens(),
            endpoint: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    /// Reject values no provider can work with.
    pub fn validate(&self) -> AppResult<()> {
        if self.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be at least 1".to_string(),
            ));
        }
        if self.max_input_tokens == 0 {
            return Err(AppError::Config(
                "Embedding max_input_tokens must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "Embedding request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
