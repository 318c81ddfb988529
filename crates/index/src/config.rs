//! Search configuration: store connection, embedding model, ingestion and
//! query settings.
//!
//! Loaded from the `store`, `embedding`, `ingest` and `query` sections of the
//! YAML config file (the same file that carries the `logging` section), then
//! overridden from environment variables.

use crate::embeddings::EmbeddingConfig;
use semsearch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Store backends `create_store` knows about.
pub const STORE_BACKENDS: &[&str] = &["elasticsearch", "memory"];

/// Complete search configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub query: QueryConfig,
}

/// Connection to the search engine and the target index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Backend: "elasticsearch" or "memory"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Base URL of the search engine
    #[serde(default = "default_host")]
    pub host: String,

    /// Index documents are written to and searched in
    #[serde(default = "default_index")]
    pub index: String,

    /// Sent as `Authorization: ApiKey <key>` when set
    #[serde(default)]
    pub api_key: Option<String>,

    /// Verify TLS certificates
    #[serde(default = "default_true")]
    pub verify_certs: bool,

    /// Upper bound on every store request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts for read-only requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestConfig {
    /// Documents per bulk write
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Emit a progress event every this many documents
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
}

/// Query settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryConfig {
    /// Candidate pool per shard; raised to `k` when smaller
    #[serde(default = "default_num_candidates")]
    pub num_candidates: usize,

    /// Results returned when the caller does not ask for a number
    #[serde(default = "default_results")]
    pub default_results: usize,
}

fn default_backend() -> String {
    "elasticsearch".to_string()
}

fn default_host() -> String {
    "http://localhost:9200".to_string()
}

fn default_index() -> String {
    "imdb".to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_batch_size() -> usize {
    10
}

fn default_progress_every() -> u64 {
    1000
}

fn default_num_candidates() -> usize {
    100
}

fn default_results() -> usize {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            host: default_host(),
            index: default_index(),
            api_key: None,
            verify_certs: true,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            progress_every: default_progress_every(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            num_candidates: default_num_candidates(),
            default_results: default_results(),
        }
    }
}

impl SearchConfig {
    /// Load configuration from an optional YAML file and the environment.
    ///
    /// Environment variables:
    /// - `ES_HOST`, `DATA_INDEX`, `ES_API_KEY`, `ES_VERIFY_CERTS`
    /// - `SEMSEARCH_STORE`
    /// - `SEMSEARCH_BATCH_SIZE`, `SEMSEARCH_NUM_CANDIDATES`
    /// - `SEMSEARCH_EMBED_PROVIDER`, `SEMSEARCH_EMBED_MODEL`,
    ///   `SEMSEARCH_EMBED_DIMENSIONS`, `OLLAMA_URL`
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;

        tracing::debug!(
            "Search config: backend={}, host={}, index={}, provider={}, model={}",
            config.store.backend,
            config.store.host,
            config.store.index,
            config.embedding.provider,
            config.embedding.model
        );

        Ok(config)
    }

    fn from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config at {:?}: {}", path, e))
        })?;

        // An empty file deserializes to null.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config at {:?}: {}", path, e)))
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_env<F>(&mut self, get: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = get("ES_HOST") {
            self.store.host = host;
        }
        if let Some(index) = get("DATA_INDEX") {
            self.store.index = index;
        }
        if let Some(key) = get("ES_API_KEY").filter(|k| !k.is_empty()) {
            self.store.api_key = Some(key);
        }
        if let Some(verify) = get("ES_VERIFY_CERTS") {
            self.store.verify_certs = parse_bool("ES_VERIFY_CERTS", &verify)?;
        }
        if let Some(backend) = get("SEMSEARCH_STORE") {
            self.store.backend = backend;
        }
        if let Some(size) = get("SEMSEARCH_BATCH_SIZE") {
            self.ingest.batch_size = parse_number("SEMSEARCH_BATCH_SIZE", &size)?;
        }
        if let Some(n) = get("SEMSEARCH_NUM_CANDIDATES") {
            self.query.num_candidates = parse_number("SEMSEARCH_NUM_CANDIDATES", &n)?;
        }
        if let Some(provider) = get("SEMSEARCH_EMBED_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Some(model) = get("SEMSEARCH_EMBED_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dims) = get("SEMSEARCH_EMBED_DIMENSIONS") {
            self.embedding.dimensions = parse_number("SEMSEARCH_EMBED_DIMENSIONS", &dims)?;
        }
        if let Some(url) = get("OLLAMA_URL") {
            self.embedding.endpoint = Some(url);
        }
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        self.embedding.validate()?;

        if !STORE_BACKENDS.contains(&self.store.backend.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown store backend: '{}'. Supported backends: {}",
                self.store.backend,
                STORE_BACKENDS.join(", ")
            )));
        }
        validate_index_name(&self.store.index)?;

        if self.store.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "Store request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.ingest.batch_size == 0 {
            return Err(AppError::Config("Batch size must be at least 1".to_string()));
        }
        if self.ingest.progress_every == 0 {
            return Err(AppError::Config(
                "Progress interval must be at least 1".to_string(),
            ));
        }
        if self.query.num_candidates == 0 || self.query.default_results == 0 {
            return Err(AppError::Config(
                "num_candidates and default_results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Index names must be lowercase and usable as a URL path segment.
pub fn validate_index_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::Config("Index name is empty".to_string()));
    }
    if name.starts_with(['-', '_', '+']) || name == "." || name == ".." {
        return Err(AppError::Config(format!(
            "Index name '{}' cannot start with '-', '_' or '+'",
            name
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| c.is_uppercase() || c.is_whitespace() || "\\/*?\"<>|,#:".contains(*c))
    {
        return Err(AppError::Config(format!(
            "Index name '{}' contains invalid character {:?}",
            name, bad
        )));
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> AppResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a number, got '{}'", key, value)))
}

fn parse_bool(key: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!(
            "{} must be true or false, got '{}'",
            key, value
        ))),
    }
}
