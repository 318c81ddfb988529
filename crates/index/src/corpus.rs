//! Corpus readers.
//!
//! A corpus is a stream of [`CorpusRecord`]s. Items are `Err(AppError::Corpus)`
//! for records that could not be decoded (the pipeline skips them) and any
//! other error for failures of the underlying source (the pipeline aborts).

use crate::types::CorpusRecord;
use futures::stream::{self, Stream};
use semsearch_core::{AppError, AppResult};
use std::path::Path;
use std::pin::Pin;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Boxed record stream consumed by the ingestion pipeline.
pub type CorpusStream = Pin<Box<dyn Stream<Item = AppResult<CorpusRecord>> + Send>>;

/// Newline-delimited JSON corpus, one `{"text": ..., "label": ...}` per line.
pub struct JsonlCorpus;

impl JsonlCorpus {
    /// Stream records from a file.
    pub async fn open(path: &Path) -> AppResult<CorpusStream> {
        let file = tokio::fs::File::open(path).await.map_err(|e| {
            AppError::Corpus(format!("Failed to open corpus {:?}: {}", path, e))
        })?;

        tracing::info!("Reading corpus from {:?}", path);
        Ok(Self::from_reader(
            BufReader::new(file),
            path.display().to_string(),
        ))
    }

    /// Stream records from standard input.
    pub fn stdin() -> CorpusStream {
        tracing::info!("Reading corpus from stdin");
        Self::from_reader(BufReader::new(tokio::io::stdin()), "<stdin>".to_string())
    }

    /// Stream records from any buffered reader.
    ///
    /// Blank lines are ignored. Lines that are not UTF-8 or not a JSON record
    /// become `AppError::Corpus` items. The stream ends after the first read
    /// error.
    pub fn from_reader<R>(reader: R, source: String) -> CorpusStream
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let state = Some((reader, Vec::new(), 0u64, source));

        Box::pin(stream::unfold(state, |state| async move {
            let (mut reader, mut buf, mut line_no, source) = state?;
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => return None,
                    Ok(_) => {
                        line_no += 1;
                        let record = match std::str::from_utf8(&buf) {
                            Ok(line) if line.trim().is_empty() => continue,
                            Ok(line) => parse_line(line, line_no, &source),
                            Err(e) => Err(AppError::Corpus(format!(
                                "{}:{}: invalid UTF-8: {}",
                                source, line_no, e
                            ))),
                        };
                        return Some((record, Some((reader, buf, line_no, source))));
                    }
                    Err(e) => return Some((Err(AppError::Io(e)), None)),
                }
            }
        }))
    }
}

/// Stream over records already in memory.
pub fn from_records(records: Vec<CorpusRecord>) -> CorpusStream {
    Box::pin(stream::iter(records.into_iter().map(Ok)))
}

fn parse_line(line: &str, line_no: u64, source: &str) -> AppResult<CorpusRecord> {
    serde_json::from_str(line)
        .map_err(|e| AppError::Corpus(format!("{}:{}: invalid record: {}", source, line_no, e)))
}
