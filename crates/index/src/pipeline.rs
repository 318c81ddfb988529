//! Ingestion pipeline: corpus records in, bulk writes out.
//!
//! Records are processed one at a time in arrival order. Each record with
//! text is embedded and appended to a bounded batch; a full batch is written
//! with a single bulk request and cleared, and the tail is flushed when the
//! corpus ends.

use crate::corpus::CorpusStream;
use crate::embeddings::Embedder;
use crate::progress::ProgressReporter;
use crate::store::{BulkOutcome, VectorStore};
use crate::types::{Document, IngestReport};
use futures::StreamExt;
use semsearch_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Documents waiting for the next bulk write.
#[derive(Debug)]
pub struct Batch {
    documents: Vec<Document>,
    capacity: usize,
}

impl Batch {
    pub fn new(capacity: usize) -> Self {
        Self {
            documents: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, document: Document) {
        self.documents.push(document);
    }

    pub fn is_full(&self) -> bool {
        self.documents.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Hand the documents over and leave the batch empty.
    pub fn take(&mut self) -> Vec<Document> {
        std::mem::replace(&mut self.documents, Vec::with_capacity(self.capacity))
    }
}

/// Embeds corpus records and writes them to an existing index.
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    progress: ProgressReporter,
    progress_every: u64,
}

impl IngestPipeline {
    pub fn new(embedder: Embedder, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            progress: ProgressReporter::noop(),
            progress_every: 1000,
        }
    }

    /// Report progress every `every` processed records and on each flush.
    pub fn with_progress(mut self, progress: ProgressReporter, every: u64) -> Self {
        self.progress = progress;
        self.progress_every = every.max(1);
        self
    }

    /// Ingest every record of `corpus` into `index`.
    ///
    /// Missing text, undecodable records, embedding failures and documents
    /// rejected by the store are counted in the report and never stop the
    /// run. An unreachable store, a timeout or a vanished index abort it
    /// with the error; documents already written stay in the index.
    ///
    /// Re-ingesting into a populated index adds duplicates; use
    /// [`crate::IndexManager::ensure_clean_index`] first for a rebuild.
    #[instrument(skip(self, corpus), fields(backend = self.store.backend_name()))]
    pub async fn ingest(
        &self,
        mut corpus: CorpusStream,
        index: &str,
        batch_size: usize,
    ) -> AppResult<IngestReport> {
        if batch_size == 0 {
            return Err(AppError::Config("Batch size must be at least 1".to_string()));
        }

        let started = Instant::now();
        let mut report = IngestReport::new(index);
        let mut batch = Batch::new(batch_size);
        let dimensions = self.embedder.dimensions();
        let model = self.embedder.provider().model_name().to_string();

        info!(
            "Ingesting into '{}' with batch size {} (model: {})",
            index, batch_size, model
        );

        while let Some(item) = corpus.next().await {
            report.records_seen += 1;

            let record = match item {
                Ok(record) => record,
                Err(AppError::Corpus(msg)) => {
                    warn!("Skipping record {}: {}", report.records_seen, msg);
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!("Corpus read failed after {} records: {}", report.records_seen, e);
                    return Err(e);
                }
            };

            // Blank text is treated like missing text. Other text that embeds
            // to a zero vector fails in the embedder.
            let Some(text) = record.text.filter(|t| !t.trim().is_empty()) else {
                debug!("Skipping record {} without text", report.records_seen);
                report.skipped += 1;
                continue;
            };

            let document = match self.embedder.embed(&text).await {
                Ok(embedding) => Document::from_embedding(text, record.label, embedding, dimensions),
                Err(e) => Err(e),
            };

            match document {
                Ok(document) => batch.push(document),
                Err(e) => {
                    warn!("Embedding failed for record {}: {}", report.records_seen, e);
                    report.embedding_failures += 1;
                }
            }

            if report.records_seen % self.progress_every == 0 {
                self.progress.embed(report.records_seen, &model);
            }

            if batch.is_full() {
                self.flush(index, &mut batch, &mut report).await?;
            }
        }

        if !batch.is_empty() {
            self.flush(index, &mut batch, &mut report).await?;
        }

        report.duration_secs = started.elapsed().as_secs_f64();
        self.progress
            .done(report.indexed, report.skipped, report.failed());

        info!(
            "Ingestion into '{}' finished: {} indexed, {} skipped, {} failed in {:.2}s",
            index,
            report.indexed,
            report.skipped,
            report.failed(),
            report.duration_secs
        );

        Ok(report)
    }

    /// Write the batch in one bulk request and clear it.
    async fn flush(
        &self,
        index: &str,
        batch: &mut Batch,
        report: &mut IngestReport,
    ) -> AppResult<()> {
        let documents = batch.take();
        let submitted = documents.len();
        report.batches_flushed += 1;

        match self.store.bulk_write(index, &documents).await {
            Ok(outcome) => self.record_outcome(&outcome, submitted, report),
            Err(e) if e.is_fatal_for_ingest() => {
                error!(
                    "Bulk write {} to '{}' failed, aborting: {}",
                    report.batches_flushed, index, e
                );
                return Err(e);
            }
            Err(e) => {
                warn!(
                    "Bulk write {} of {} documents failed: {}",
                    report.batches_flushed, submitted, e
                );
                report.write_failures += submitted as u64;
            }
        }

        debug!(
            "Flushed batch {} ({} documents, {} indexed so far)",
            report.batches_flushed, submitted, report.indexed
        );
        self.progress
            .flush(report.indexed, report.batches_flushed, submitted);
        Ok(())
    }

    fn record_outcome(&self, outcome: &BulkOutcome, submitted: usize, report: &mut IngestReport) {
        for failure in &outcome.failures {
            warn!(
                "Document {} of batch {} rejected (status {}): {}",
                failure.position, report.batches_flushed, failure.status, failure.reason
            );
        }

        let accounted = outcome.succeeded + outcome.failures.len();
        report.indexed += outcome.succeeded as u64;
        report.write_failures +=
            outcome.failures.len() as u64 + submitted.saturating_sub(accounted) as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::from_records;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::tests::support::{FailingEmbedder, RecordingStore, StoreBehavior};
    use crate::types::CorpusRecord;

    fn embedder() -> Embedder {
        Embedder::new(Arc::new(TrigramProvider::new(16)), 512)
    }

    fn records(n: usize) -> Vec<CorpusRecord> {
        (0..n)
            .map(|i| CorpusRecord::new(format!("review number {} of a film", i), (i % 2) as i64))
            .collect()
    }

    #[test]
    fn test_batch_take_clears() {
        let mut batch = Batch::new(2);
        batch.push(Document::from_embedding("a".into(), None, vec![1.0], 1).unwrap());
        assert!(!batch.is_full());
        batch.push(Document::from_embedding("b".into(), None, vec![1.0], 1).unwrap());
        assert!(batch.is_full());

        assert_eq!(batch.take().len(), 2);
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }

    #[tokio::test]
    async fn test_batches_with_tail_flush() {
        let store = Arc::new(RecordingStore::new(StoreBehavior::AcceptAll));
        let pipeline = IngestPipeline::new(embedder(), store.clone());

        let report = pipeline
            .ingest(from_records(records(23)), "imdb", 10)
            .await
            .unwrap();

        assert_eq!(store.batch_sizes(), vec![10, 10, 3]);
        assert_eq!(report.batches_flushed, 3);
        assert_eq!(report.indexed, 23);
        assert_eq!(report.records_seen, 23);
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_empty_flush() {
        let store = Arc::new(RecordingStore::new(StoreBehavior::AcceptAll));
        let pipeline = IngestPipeline::new(embedder(), store.clone());

        pipeline
            .ingest(from_records(records(20)), "imdb", 10)
            .await
            .unwrap();
        assert_eq!(store.batch_sizes(), vec![10, 10]);
    }

    #[tokio::test]
    async fn test_missing_text_is_skipped() {
        let store = Arc::new(RecordingStore::new(StoreBehavior::AcceptAll));
        let pipeline = IngestPipeline::new(embedder(), store.clone());

        let mut corpus = records(4);
        corpus.insert(2, CorpusRecord { text: None, label: Some(1) });

        let report = pipeline.ingest(from_records(corpus), "imdb", 10).await.unwrap();
        assert_eq!(report.records_seen, 5);
        assert_eq!(report.indexed, 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn test_labels_default_to_unlabeled() {
        let store = Arc::new(RecordingStore::new(StoreBehavior::AcceptAll));
        let pipeline = IngestPipeline::new(embedder(), store.clone());

        pipeline
            .ingest(from_records(vec![CorpusRecord::unlabeled("no label here")]), "imdb", 10)
            .await
            .unwrap();
        assert_eq!(store.documents()[0].label(), crate::types::UNLABELED);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_counted() {
        let store = Arc::new(RecordingStore::new(StoreBehavior::AcceptAll));
        let embedder = Embedder::new(Arc::new(FailingEmbedder::new(16, "poison")), 512);
        let pipeline = IngestPipeline::new(embedder, store.clone());

        let corpus = vec![
            CorpusRecord::new("fine review", 1),
            CorpusRecord::new("poison review", 0),
            CorpusRecord::new("another fine review", 1),
        ];

        let report = pipeline.ingest(from_records(corpus), "imdb", 10).await.unwrap();
        assert_eq!(report.indexed, 2);
        assert_eq!(report.embedding_failures, 1);
    }

    #[tokio::test]
    async fn test_zero_vector_text_is_embedding_failure() {
        let store = Arc::new(RecordingStore::new(StoreBehavior::AcceptAll));
        let pipeline = IngestPipeline::new(embedder(), store.clone());

        let corpus = vec![
            CorpusRecord::new("A great Italian mini-series", 1),
            CorpusRecord::new("It is OK", 0),
        ];

        let report = pipeline.ingest(from_records(corpus), "imdb", 10).await.unwrap();
        assert_eq!(report.indexed, 1);
        assert_eq!(report.embedding_failures, 1);
        assert_eq!(store.documents().len(), 1);
    }

    #[tokio::test]
    async fn test_item_failures_do_not_halt() {
        let store = Arc::new(RecordingStore::new(StoreBehavior::RejectPositions(vec![1])));
        let pipeline = IngestPipeline::new(embedder(), store.clone());

        let report = pipeline
            .ingest(from_records(records(6)), "imdb", 3)
            .await
            .unwrap();

        assert_eq!(store.batch_sizes(), vec![3, 3]);
        assert_eq!(report.indexed, 4);
        assert_eq!(report.write_failures, 2);
    }

    #[tokio::test]
    async fn test_rejected_request_counts_whole_batch() {
        let store = Arc::new(RecordingStore::new(StoreBehavior::FailRequest));
        let pipeline = IngestPipeline::new(embedder(), store.clone());

        let report = pipeline
            .ingest(from_records(records(5)), "imdb", 2)
            .await
            .unwrap();

        assert_eq!(report.batches_flushed, 3);
        assert_eq!(report.indexed, 0);
        assert_eq!(report.write_failures, 5);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_fatal() {
        let store = Arc::new(RecordingStore::new(StoreBehavior::Unreachable));
        let pipeline = IngestPipeline::new(embedder(), store.clone());

        let err = pipeline
            .ingest(from_records(records(25)), "imdb", 10)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::StoreUnavailable(_)));
        assert_eq!(store.batch_sizes(), vec![10]);
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let store = Arc::new(RecordingStore::new(StoreBehavior::AcceptAll));
        let pipeline = IngestPipeline::new(embedder(), store);

        assert!(pipeline
            .ingest(from_records(records(1)), "imdb", 0)
            .await
            .is_err());
    }
}
