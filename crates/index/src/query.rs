//! Nearest-neighbor query service.

use crate::embeddings::Embedder;
use crate::store::{KnnQuery, VectorStore};
use crate::types::{QueryOutcome, SearchHit};
use semsearch_core::{AppError, AppResult};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default candidate pool for approximate search.
pub const DEFAULT_NUM_CANDIDATES: usize = 100;

/// Answers similarity queries against one index.
///
/// Must be built with the same embedding configuration that populated the
/// index; the recorded schema is checked before every search.
#[derive(Debug, Clone)]
pub struct QueryService {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    index: String,
    num_candidates: usize,
}

impl QueryService {
    pub fn new(embedder: Embedder, store: Arc<dyn VectorStore>, index: impl Into<String>) -> Self {
        Self {
            embedder,
            store,
            index: index.into(),
            num_candidates: DEFAULT_NUM_CANDIDATES,
        }
    }

    pub fn with_num_candidates(mut self, num_candidates: usize) -> Self {
        self.num_candidates = num_candidates;
        self
    }

    /// Top-`k` documents closest to `query_text`, best first.
    ///
    /// Never fails: any error is logged and returned in the outcome next to
    /// an empty hit list.
    pub async fn search(&self, query_text: &str, k: usize) -> QueryOutcome {
        match self.try_search(query_text, k).await {
            Ok(hits) => QueryOutcome { hits, error: None },
            Err(e) => {
                warn!("Query against '{}' failed: {}", self.index, e);
                QueryOutcome {
                    hits: Vec::new(),
                    error: Some(e),
                }
            }
        }
    }

    /// Like [`search`](Self::search) but returns the error.
    #[instrument(skip(self, query_text), fields(index = %self.index))]
    pub async fn try_search(&self, query_text: &str, k: usize) -> AppResult<Vec<SearchHit>> {
        if k == 0 {
            return Err(AppError::Config(
                "Number of results must be at least 1".to_string(),
            ));
        }
        if query_text.trim().is_empty() {
            return Err(AppError::Embedding("Query text is empty".to_string()));
        }

        let schema = self
            .store
            .index_schema(&self.index)
            .await?
            .ok_or_else(|| AppError::IndexNotFound(self.index.clone()))?;
        schema.validate_embedder(self.embedder.provider())?;

        let query_vector = self.embedder.embed(query_text).await?;
        let query = self.knn_query(schema.field, query_vector, k);
        debug!(
            "Searching '{}' (k={}, num_candidates={})",
            self.index, query.k, query.num_candidates
        );

        let mut hits = self.store.vector_search(&self.index, &query).await?;
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);

        info!(
            "Query returned {} hits (top score: {:.3})",
            hits.len(),
            hits.first().map(|h| h.score).unwrap_or(0.0)
        );
        Ok(hits)
    }

    /// The candidate pool never drops below `k`.
    fn knn_query(&self, field: String, query_vector: Vec<f32>, k: usize) -> KnnQuery {
        KnnQuery {
            field,
            query_vector,
            k,
            num_candidates: self.num_candidates.max(k),
        }
    }
}
