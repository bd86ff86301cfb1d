//! Configuration management for the FakeML gateway
//!
//! Settings are layered from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Environment Variables
//!
//! Any value can be overridden with `FAKEML__<section>__<key>`:
//! - `FAKEML__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `FAKEML__RATE_LIMIT__DAILY_LIMIT=50`
//! - `FAKEML__UPSTREAM__GENERATE_URL=https://example.com/fakeml`
//!
//! # Configuration File
//!
//! Loaded from `config/fakeml.toml` unless `FAKEML_CONFIG` or an explicit path says otherwise.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{Config, DownloadConfig, RateLimitConfig, ServerConfig, UpstreamConfig};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// `path` replaces the `FAKEML_CONFIG` / default file location when given.
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path, skipping `.env`
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
