//! Ingest command handler.
//!
//! Rebuilds the configured index and fills it from a JSONL corpus.

use anyhow::Context;
use clap::Args;
use semsearch_index::{
    create_store, run_ingest, Embedder, JsonlCorpus, ProgressReporter, SearchConfig,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Rebuild the index and ingest a corpus into it
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// JSONL corpus with one `{"text": ..., "label": ...}` object per line (`-` for stdin)
    #[arg(long, default_value = "-")]
    pub corpus: PathBuf,

    /// Documents per bulk write
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Output the final report as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &SearchConfig) -> anyhow::Result<()> {
        tracing::info!("Executing ingest command");
        tracing::debug!("Ingest options: {:?}", self);

        let mut config = config.clone();
        if let Some(batch_size) = self.batch_size {
            config.ingest.batch_size = batch_size;
        }
        config.validate()?;

        if config.store.backend == "memory" {
            tracing::warn!("The memory store is discarded when the process exits");
        }

        // Load the model before touching the index
        let embedder = Embedder::from_config(&config.embedding)
            .await
            .context("Failed to load embedding model")?;
        let store = create_store(&config.store)?;

        let corpus = if self.corpus.as_os_str() == "-" {
            JsonlCorpus::stdin()
        } else {
            JsonlCorpus::open(&self.corpus).await?
        };

        let progress = ProgressReporter::new(Arc::new(|event| {
            tracing::info!("{}", event.format_simple());
        }));

        let report = run_ingest(&config, &embedder, store, corpus, progress)
            .await
            .with_context(|| format!("Ingestion into '{}' failed", config.store.index))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!(
                "Indexed {} documents into '{}' ({} skipped, {} failed) in {:.2}s",
                report.indexed,
                report.index,
                report.skipped,
                report.failed(),
                report.duration_secs
            );
        }

        Ok(())
    }
}
