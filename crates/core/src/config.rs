//! Process-level configuration for semsearch.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - A `.env` file in the working directory (loaded first, never overrides
//!   variables already set)
//! - Environment variables
//! - Command-line flags
//! - The `logging` section of the YAML config file
//!
//! Store, embedding, ingestion and query settings live in
//! `semsearch_index::config::SearchConfig`, which reads the same file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "semsearch.yaml";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            log_level: None,
            log_format: LogFormat::Pretty,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env`, environment variables and defaults.
    ///
    /// `config_file` is the path given on the command line, if any; it wins
    /// over `SEMSEARCH_CONFIG`.
    ///
    /// Environment variables:
    /// - `SEMSEARCH_CONFIG`: Path to config file
    /// - `SEMSEARCH_LOG_FORMAT`: `pretty` or `json`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load(config_file: Option<PathBuf>) -> AppResult<Self> {
        // Runs before logging is initialized. A missing .env is normal.
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        config.config_file =
            config_file.or_else(|| std::env::var("SEMSEARCH_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = config.resolve_config_file() {
            config = config.merge_yaml(&path)?;
        } else if let Some(ref explicit) = config.config_file {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                explicit
            )));
        }

        // Environment variables override YAML config
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if let Ok(format) = std::env::var("SEMSEARCH_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }

        if std::env::var_os("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// The config file that will actually be read, if any.
    ///
    /// An explicit path is returned only when it exists; otherwise
    /// `semsearch.yaml` in the working directory is used when present.
    pub fn resolve_config_file(&self) -> Option<PathBuf> {
        match self.config_file {
            Some(ref path) => path.exists().then(|| path.clone()),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                fallback.exists().then_some(fallback)
            }
        }
    }

    /// Merge the `logging` section of a YAML config file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();
        result.config_file = Some(path.to_path_buf());

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    pub fn with_overrides(
        mut self,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
    ) -> Self {
        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if log_json {
            self.log_format = LogFormat::Json;
        }

        self
    }
}
