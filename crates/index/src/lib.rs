//! Semantic search over a text corpus.
//!
//! Embeds documents with a pluggable model provider, stores them in a
//! vector-capable search index and answers nearest-neighbor queries.

pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod index_manager;
pub mod pipeline;
pub mod progress;
pub mod query;
pub mod schema;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::SearchConfig;
pub use corpus::{CorpusStream, JsonlCorpus};
pub use embeddings::{Embedder, EmbeddingConfig, EmbeddingProvider};
pub use index_manager::IndexManager;
pub use pipeline::IngestPipeline;
pub use progress::{ProgressEvent, ProgressReporter};
pub use query::QueryService;
pub use schema::IndexSchema;
pub use store::{create_store, VectorStore};
pub use types::{CorpusRecord, IndexStats, IngestReport, QueryOutcome, SearchHit};

use semsearch_core::{AppError, AppResult};
use std::sync::Arc;

/// Rebuild the configured index and ingest `corpus` into it.
///
/// Nothing is deleted unless the store answers and the embedder matches the
/// configured dimensionality; both failures abort before the index is
/// touched. The index is refreshed at the end so the documents are
/// immediately searchable. A failed refresh is logged and the report is
/// still returned.
pub async fn run_ingest(
    config: &SearchConfig,
    embedder: &Embedder,
    store: Arc<dyn VectorStore>,
    corpus: CorpusStream,
    progress: ProgressReporter,
) -> AppResult<IngestReport> {
    let index = config.store.index.as_str();

    tracing::info!(
        "Starting ingestion into '{}' on {}",
        index,
        store.backend_name()
    );

    store.ping().await?;

    if embedder.dimensions() != config.embedding.dimensions {
        return Err(AppError::SchemaMismatch(format!(
            "Embedder '{}' produces {} dimensions, configuration declares {}",
            embedder.provider().model_name(),
            embedder.dimensions(),
            config.embedding.dimensions
        )));
    }

    let schema = IndexSchema::for_provider(embedder.provider());
    IndexManager::new(store.clone())
        .ensure_clean_index(index, &schema)
        .await?;
    progress.rebuild(index, schema.dimensions);

    let report = IngestPipeline::new(embedder.clone(), store.clone())
        .with_progress(progress, config.ingest.progress_every)
        .ingest(corpus, index, config.ingest.batch_size)
        .await?;

    if let Err(e) = store.refresh(index).await {
        tracing::warn!(
            "Refresh of '{}' failed, documents may not be searchable yet: {}",
            index,
            e
        );
    }

    Ok(report)
}

/// Document count and recorded schema of an index.
pub async fn index_stats(store: &dyn VectorStore, name: &str) -> AppResult<IndexStats> {
    tracing::info!("Getting stats for index '{}'", name);

    let schema = store
        .index_schema(name)
        .await?
        .ok_or_else(|| AppError::IndexNotFound(name.to_string()))?;
    let document_count = store.count(name).await?;

    Ok(IndexStats {
        index: name.to_string(),
        document_count,
        schema,
    })
}
