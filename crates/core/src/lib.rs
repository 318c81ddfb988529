//! semsearch core library
//!
//! This crate provides the foundational utilities shared by the index crate
//! and the CLI:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Process-level configuration

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
