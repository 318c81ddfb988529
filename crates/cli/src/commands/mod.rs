//! Command handlers for the semsearch CLI.

pub mod ingest;
pub mod query;
pub mod stats;

pub use ingest::IngestCommand;
pub use query::QueryCommand;
pub use stats::StatsCommand;
