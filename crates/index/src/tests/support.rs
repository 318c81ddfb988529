//! Test doubles for the store and embedding boundaries.

use crate::embeddings::providers::trigram::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::schema::IndexSchema;
use crate::store::{BulkItemFailure, BulkOutcome, KnnQuery, VectorStore};
use crate::types::{Document, SearchHit};
use async_trait::async_trait;
use semsearch_core::{AppError, AppResult};
use std::sync::Mutex;

/// How [`RecordingStore`] answers bulk writes.
#[derive(Debug, Clone)]
pub enum StoreBehavior {
    AcceptAll,
    /// Reject these positions in every batch
    RejectPositions(Vec<usize>),
    /// Fail every bulk request with a non-fatal store error
    FailRequest,
    /// Behave like a store that went away
    Unreachable,
    /// Accept every write but fail the final refresh
    FailRefresh,
}

/// Store that records every bulk write it receives.
#[derive(Debug)]
pub struct RecordingStore {
    behavior: StoreBehavior,
    batches: Mutex<Vec<Vec<Document>>>,
}

impl RecordingStore {
    pub fn new(behavior: StoreBehavior) -> Self {
        Self {
            behavior,
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn documents(&self) -> Vec<Document> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }

    fn unreachable() -> AppError {
        AppError::StoreUnavailable("connection refused".to_string())
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    fn backend_name(&self) -> &str {
        "recording"
    }

    async fn ping(&self) -> AppResult<()> {
        match self.behavior {
            StoreBehavior::Unreachable => Err(Self::unreachable()),
            _ => Ok(()),
        }
    }

    async fn index_exists(&self, _name: &str) -> AppResult<bool> {
        Ok(false)
    }

    async fn delete_index(&self, name: &str) -> AppResult<()> {
        Err(AppError::IndexNotFound(name.to_string()))
    }

    async fn create_index(&self, _name: &str, _schema: &IndexSchema) -> AppResult<()> {
        Ok(())
    }

    async fn index_schema(&self, _name: &str) -> AppResult<Option<IndexSchema>> {
        Ok(None)
    }

    async fn bulk_write(&self, _name: &str, documents: &[Document]) -> AppResult<BulkOutcome> {
        self.batches.lock().unwrap().push(documents.to_vec());

        match self.behavior {
            StoreBehavior::AcceptAll | StoreBehavior::FailRefresh => {
                Ok(BulkOutcome::all_succeeded(documents.len()))
            }
            StoreBehavior::RejectPositions(ref positions) => {
                let failures: Vec<BulkItemFailure> = positions
                    .iter()
                    .filter(|&&p| p < documents.len())
                    .map(|&position| BulkItemFailure {
                        position,
                        status: 400,
                        reason: "mapper_parsing_exception: failed to parse".to_string(),
                    })
                    .collect();
                Ok(BulkOutcome {
                    succeeded: documents.len() - failures.len(),
                    failures,
                })
            }
            StoreBehavior::FailRequest => {
                Err(AppError::Store("Elasticsearch answered 413: too large".to_string()))
            }
            StoreBehavior::Unreachable => Err(Self::unreachable()),
        }
    }

    async fn vector_search(&self, name: &str, _query: &KnnQuery) -> AppResult<Vec<SearchHit>> {
        Err(AppError::IndexNotFound(name.to_string()))
    }

    async fn refresh(&self, _name: &str) -> AppResult<()> {
        match self.behavior {
            StoreBehavior::FailRefresh => Err(Self::unreachable()),
            _ => Ok(()),
        }
    }

    async fn count(&self, _name: &str) -> AppResult<u64> {
        Ok(self.documents().len() as u64)
    }
}

/// Trigram embedder that fails for texts containing a marker word.
#[derive(Debug)]
pub struct FailingEmbedder {
    inner: TrigramProvider,
    poison: String,
}

impl FailingEmbedder {
    pub fn new(dimensions: usize, poison: &str) -> Self {
        Self {
            inner: TrigramProvider::new(dimensions),
            poison: poison.to_string(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.contains(&self.poison) {
            return Err(AppError::Embedding(format!("cannot embed '{}'", text)));
        }
        self.inner.embed(text).await
    }
}
