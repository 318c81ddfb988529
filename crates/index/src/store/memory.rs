//! In-process vector store with exact nearest-neighbor search.
//!
//! Used for local runs without Elasticsearch and by the test suite. Search
//! scores every document, so results are exact rather than approximate.

use crate::schema::IndexSchema;
use crate::store::{BulkItemFailure, BulkOutcome, KnnQuery, VectorStore};
use crate::types::{Document, SearchHit};
use async_trait::async_trait;
use semsearch_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug)]
struct StoredDocument {
    id: String,
    document: Document,
}

#[derive(Debug)]
struct MemoryIndex {
    schema: IndexSchema,
    documents: Vec<StoredDocument>,
}

/// Store holding every index in a process-local map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    indices: RwLock<HashMap<String, MemoryIndex>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> AppError {
        AppError::Store("Memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn index_exists(&self, name: &str) -> AppResult<bool> {
        let indices = self.indices.read().map_err(|_| Self::poisoned())?;
        Ok(indices.contains_key(name))
    }

    async fn delete_index(&self, name: &str) -> AppResult<()> {
        let mut indices = self.indices.write().map_err(|_| Self::poisoned())?;
        indices
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AppError::IndexNotFound(name.to_string()))
    }

    async fn create_index(&self, name: &str, schema: &IndexSchema) -> AppResult<()> {
        schema.validate()?;

        let mut indices = self.indices.write().map_err(|_| Self::poisoned())?;
        if indices.contains_key(name) {
            return Err(AppError::Store(format!("Index '{}' already exists", name)));
        }

        indices.insert(
            name.to_string(),
            MemoryIndex {
                schema: schema.clone(),
                documents: Vec::new(),
            },
        );
        Ok(())
    }

    async fn index_schema(&self, name: &str) -> AppResult<Option<IndexSchema>> {
        let indices = self.indices.read().map_err(|_| Self::poisoned())?;
        Ok(indices.get(name).map(|index| index.schema.clone()))
    }

    async fn bulk_write(&self, name: &str, documents: &[Document]) -> AppResult<BulkOutcome> {
        let mut indices = self.indices.write().map_err(|_| Self::poisoned())?;
        let index = indices
            .get_mut(name)
            .ok_or_else(|| AppError::IndexNotFound(name.to_string()))?;

        let mut outcome = BulkOutcome::default();
        for (position, document) in documents.iter().enumerate() {
            if document.embedding().len() != index.schema.dimensions {
                outcome.failures.push(BulkItemFailure {
                    position,
                    status: 400,
                    reason: format!(
                        "vector has {} dimensions, field '{}' expects {}",
                        document.embedding().len(),
                        index.schema.field,
                        index.schema.dimensions
                    ),
                });
                continue;
            }

            index.documents.push(StoredDocument {
                id: uuid::Uuid::new_v4().to_string(),
                document: document.clone(),
            });
            outcome.succeeded += 1;
        }

        Ok(outcome)
    }

    async fn vector_search(&self, name: &str, query: &KnnQuery) -> AppResult<Vec<SearchHit>> {
        query.validate()?;

        let indices = self.indices.read().map_err(|_| Self::poisoned())?;
        let index = indices
            .get(name)
            .ok_or_else(|| AppError::IndexNotFound(name.to_string()))?;

        if query.query_vector.len() != index.schema.dimensions {
            return Err(AppError::SchemaMismatch(format!(
                "Query vector has {} dimensions, field '{}' expects {}",
                query.query_vector.len(),
                index.schema.field,
                index.schema.dimensions
            )));
        }

        let similarity = index.schema.similarity;
        let mut scored: Vec<SearchHit> = index
            .documents
            .iter()
            .map(|stored| SearchHit {
                id: stored.id.clone(),
                text: stored.document.text().to_string(),
                label: stored.document.label(),
                score: similarity.score(&query.query_vector, stored.document.embedding()),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(query.k);
        Ok(scored)
    }

    async fn count(&self, name: &str) -> AppResult<u64> {
        let indices = self.indices.read().map_err(|_| Self::poisoned())?;
        indices
            .get(name)
            .map(|index| index.documents.len() as u64)
            .ok_or_else(|| AppError::IndexNotFound(name.to_string()))
    }
}
