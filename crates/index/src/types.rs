//! Search system type definitions.

use chrono::{DateTime, Utc};
use semsearch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Label stored for records that carry none.
pub const UNLABELED: i64 = -1;

/// One record of the input corpus, as read from a dataset split.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    /// Document text; records without it are skipped
    #[serde(default)]
    pub text: Option<String>,

    /// Class label, if the split is labeled
    #[serde(default)]
    pub label: Option<i64>,
}

impl CorpusRecord {
    pub fn new(text: impl Into<String>, label: i64) -> Self {
        Self {
            text: Some(text.into()),
            label: Some(label),
        }
    }

    pub fn unlabeled(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            label: None,
        }
    }
}

/// A document ready to be written to the store.
///
/// The embedding is checked against the schema dimensionality when the
/// document is built, so every `Document` in a batch has the right shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    text: String,
    label: i64,
    embedding: Vec<f32>,
}

impl Document {
    /// Build a document from an embedder output.
    pub fn from_embedding(
        text: String,
        label: Option<i64>,
        embedding: Vec<f32>,
        dimensions: usize,
    ) -> AppResult<Self> {
        if embedding.len() != dimensions {
            return Err(AppError::Embedding(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                dimensions,
                embedding.len()
            )));
        }

        Ok(Self {
            text,
            label: label.unwrap_or(UNLABELED),
            embedding,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn label(&self) -> i64 {
        self.label
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Store-assigned document id
    pub id: String,

    /// Indexed text
    pub text: String,

    /// Stored label (`-1` when unlabeled)
    pub label: i64,

    /// Similarity score, higher is closer
    pub score: f32,
}

/// Final summary of an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Target index
    pub index: String,

    /// Records read from the corpus
    pub records_seen: u64,

    /// Documents the store acknowledged
    pub indexed: u64,

    /// Records without text, or that could not be decoded
    pub skipped: u64,

    /// Documents whose embedding failed
    pub embedding_failures: u64,

    /// Documents the store rejected
    pub write_failures: u64,

    /// Bulk writes issued
    pub batches_flushed: u64,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration in seconds
    pub duration_secs: f64,
}

impl IngestReport {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            records_seen: 0,
            indexed: 0,
            skipped: 0,
            embedding_failures: 0,
            write_failures: 0,
            batches_flushed: 0,
            started_at: Utc::now(),
            duration_secs: 0.0,
        }
    }

    /// Documents lost to embedding or write failures.
    pub fn failed(&self) -> u64 {
        self.embedding_failures + self.write_failures
    }
}

/// Result of a query that never fails outright.
///
/// When `error` is set, `hits` is empty.
#[derive(Debug, Default)]
pub struct QueryOutcome {
    pub hits: Vec<SearchHit>,
    pub error: Option<AppError>,
}

impl QueryOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Document count and schema of an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub index: String,
    pub document_count: u64,
    pub schema: crate::schema::IndexSchema,
}
