//! Vector store abstraction.
//!
//! Defines the operations the pipeline and query service need from a search
//! engine with dense vector support, plus the backends that implement them.

pub mod elasticsearch;
pub mod memory;

pub use elasticsearch::ElasticsearchStore;
pub use memory::MemoryStore;

use crate::config::StoreConfig;
use crate::schema::IndexSchema;
use crate::types::{Document, SearchHit};
use semsearch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A nearest-neighbor query against one vector field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnnQuery {
    pub field: String,
    pub query_vector: Vec<f32>,
    pub k: usize,
    pub num_candidates: usize,
}

impl KnnQuery {
    /// Reject shapes every backend would refuse.
    pub fn validate(&self) -> AppResult<()> {
        if self.k == 0 {
            return Err(AppError::Config("k must be at least 1".to_string()));
        }
        if self.num_candidates < self.k {
            return Err(AppError::Config(format!(
                "num_candidates ({}) must be >= k ({})",
                self.num_candidates, self.k
            )));
        }
        Ok(())
    }
}

/// A document the store refused during a bulk write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemFailure {
    /// Position of the document within the submitted batch
    pub position: usize,
    /// Store status code for the item
    pub status: u16,
    /// Store-supplied reason
    pub reason: String,
}

/// Per-item result of one bulk write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub failures: Vec<BulkItemFailure>,
}

impl BulkOutcome {
    pub fn all_succeeded(count: usize) -> Self {
        Self {
            succeeded: count,
            failures: Vec::new(),
        }
    }
}

/// Trait for vector store backends.
///
/// Implementations must:
/// - report a missing index as `AppError::IndexNotFound`
/// - report connectivity problems as `AppError::StoreUnavailable` or
///   `AppError::Timeout`
/// - return search hits ordered by descending score
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync + std::fmt::Debug {
    /// Backend name for logs (e.g., "elasticsearch", "memory")
    fn backend_name(&self) -> &str;

    /// Check the store is reachable.
    async fn ping(&self) -> AppResult<()>;

    async fn index_exists(&self, name: &str) -> AppResult<bool>;

    async fn delete_index(&self, name: &str) -> AppResult<()>;

    async fn create_index(&self, name: &str, schema: &IndexSchema) -> AppResult<()>;

    /// Read back the vector field schema, `None` if the index does not exist.
    async fn index_schema(&self, name: &str) -> AppResult<Option<IndexSchema>>;

    /// Write a batch of documents in one request.
    ///
    /// Item-level rejections are returned in the outcome; an `Err` means the
    /// request as a whole failed.
    async fn bulk_write(&self, name: &str, documents: &[Document]) -> AppResult<BulkOutcome>;

    async fn vector_search(&self, name: &str, query: &KnnQuery) -> AppResult<Vec<SearchHit>>;

    /// Make previously written documents visible to search.
    async fn refresh(&self, _name: &str) -> AppResult<()> {
        Ok(())
    }

    /// Number of searchable documents in the index.
    async fn count(&self, name: &str) -> AppResult<u64>;
}

/// Create a store backend based on configuration.
pub fn create_store(config: &StoreConfig) -> AppResult<Arc<dyn VectorStore>> {
    match config.backend.as_str() {
        "elasticsearch" => Ok(Arc::new(ElasticsearchStore::new(config)?)),
        "memory" => Ok(Arc::new(MemoryStore::new())),
        other => Err(AppError::Config(format!(
            "Unknown store backend: '{}'. Supported backends: elasticsearch, memory",
            other
        ))),
    }
}
