//! Query command handler.

use anyhow::Context;
use clap::Args;
use semsearch_index::{create_store, Embedder, QueryService, SearchConfig};

/// Find the documents closest to a query
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Text to search for
    pub query_text: String,

    /// Number of results to return [default: 5]
    pub number_of_results: Option<usize>,

    /// Candidate pool for approximate search (raised to the number of results)
    #[arg(long)]
    pub num_candidates: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &SearchConfig) -> anyhow::Result<()> {
        tracing::info!("Executing query command against '{}'", config.store.index);

        let k = self
            .number_of_results
            .unwrap_or(config.query.default_results);
        let num_candidates = self.num_candidates.unwrap_or(config.query.num_candidates);

        let embedder = Embedder::from_config(&config.embedding)
            .await
            .context("Failed to load embedding model")?;
        let store = create_store(&config.store)?;

        let service = QueryService::new(embedder, store, config.store.index.as_str())
            .with_num_candidates(num_candidates);
        let outcome = service.search(&self.query_text, k).await;

        if let Some(error) = outcome.error {
            return Err(anyhow::Error::new(error)
                .context(format!("Query `{}` failed", self.query_text)));
        }

        if self.json {
            let output = serde_json::json!({
                "query": self.query_text,
                "index": config.store.index,
                "hits": outcome.hits,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Top {} results for query `{}`:", k, self.query_text);
            if outcome.hits.is_empty() {
                println!("(no results)");
            }
            for hit in &outcome.hits {
                println!("- {} (score: {:.4})", hit.text, hit.score);
            }
        }

        Ok(())
    }
}
