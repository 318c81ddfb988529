//! semsearch CLI
//!
//! Builds a vector index from a text corpus and answers similarity queries
//! against it.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{IngestCommand, QueryCommand, StatsCommand};
use semsearch_core::{config::AppConfig, logging};
use semsearch_index::SearchConfig;
use std::path::PathBuf;

/// Semantic search over a text corpus
#[derive(Parser, Debug)]
#[command(name = "semsearch")]
#[command(about = "Embed a corpus into a vector index and query it", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "SEMSEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Search engine URL (overrides ES_HOST)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Index name (overrides DATA_INDEX)
    #[arg(long, global = true)]
    index: Option<String>,

    /// Store backend: elasticsearch, memory
    #[arg(long, global = true)]
    store: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rebuild the index and ingest a corpus into it
    Ingest(IngestCommand),

    /// Find the documents closest to a query
    Query(QueryCommand),

    /// Show document count and vector schema of the index
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.clone())?.with_overrides(
        cli.log_level.clone(),
        cli.verbose,
        cli.no_color,
        cli.log_json,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;

    tracing::info!("semsearch starting");
    let config_file = config.resolve_config_file();
    tracing::debug!("Config file: {:?}", config_file);

    let mut search_config = SearchConfig::load(config_file.as_deref())
        .context("Failed to load search configuration")?;

    if let Some(host) = cli.host {
        search_config.store.host = host;
    }
    if let Some(index) = cli.index {
        search_config.store.index = index;
    }
    if let Some(store) = cli.store {
        search_config.store.backend = store;
    }
    search_config.validate()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Query(_) => "query",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&search_config).await,
        Commands::Query(cmd) => cmd.execute(&search_config).await,
        Commands::Stats(cmd) => cmd.execute(&search_config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}
