//! Stats command handler.

use clap::Args;
use semsearch_index::{create_store, index_stats, SearchConfig};

/// Show document count and vector schema of the index
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &SearchConfig) -> anyhow::Result<()> {
        tracing::info!("Executing stats command");

        let store = create_store(&config.store)?;
        let stats = index_stats(store.as_ref(), &config.store.index).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            let schema = &stats.schema;
            println!("Index: {}", stats.index);
            println!("Documents: {}", stats.document_count);
            println!(
                "Vector field: {} ({} dims, {}, indexed: {})",
                schema.field,
                schema.dimensions,
                schema.similarity.as_str(),
                schema.indexed
            );
            println!(
                "Embedding: {} / {}",
                schema.embedding_provider.as_deref().unwrap_or("unknown"),
                schema.embedding_model.as_deref().unwrap_or("unknown")
            );
        }

        Ok(())
    }
}
