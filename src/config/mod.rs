//! Configuration management for sharefetch
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//! 4. Command-line overrides applied by the caller (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use sharefetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Walking {} roots", config.roots.len());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `SHAREFETCH__<section>__<key>`
//!
//! Examples:
//! - `SHAREFETCH__DISPATCH__CONCURRENCY=8`
//! - `SHAREFETCH__DISPATCH__RESOLVE_RATE_PER_SEC=10`
//! - `SHAREFETCH__OUTPUT__DIRECTORY=/srv/downloads`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/sharefetch.toml`.
//! This can be overridden using the `SHAREFETCH_CONFIG` environment variable
//! or an explicit path.

mod models;
mod sources;
mod validation;

pub use models::{Config, DispatchConfig, OutputConfig, RetryConfig, WalkConfig};
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
    /// Load configuration from all sources (file + environment) and validate it
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(None, |_| {})
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file and environment, apply `overrides`, then validate.
    ///
    /// Validation runs last so that values supplied only on the command line
    /// (such as roots) count.
    pub fn load_with_overrides<F>(path: Option<PathBuf>, overrides: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&mut Config),
    {
        let config = Self::load_unvalidated(path, overrides)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file and environment and apply `overrides`, without
    /// validating. Used to show the effective configuration as-is.
    pub fn load_unvalidated<F>(path: Option<PathBuf>, overrides: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = sources::load(path)?;
        overrides(&mut config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }

    /// Effective configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
