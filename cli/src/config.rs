//! Configuration management for the command line.

use calsync_engine::StrategyKind;
use std::env;
use std::path::PathBuf;

/// Sync configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Snapshot file of side A
    pub store_a: PathBuf,
    /// Snapshot file of side B
    pub store_b: PathBuf,
    /// Reconciliation strategy
    pub strategy: StrategyKind,
    /// Decide and report without touching either store
    pub dry_run: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_a = lookup("CALSYNC_STORE_A")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingStore("CALSYNC_STORE_A"))?;
        let store_b = lookup("CALSYNC_STORE_B")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingStore("CALSYNC_STORE_B"))?;

        let strategy = match lookup("CALSYNC_STRATEGY") {
            Some(name) => name.parse()?,
            None => StrategyKind::default(),
        };

        let dry_run = match lookup("CALSYNC_DRY_RUN") {
            Some(value) => parse_flag(&value).ok_or(ConfigError::InvalidDryRun(value))?,
            None => false,
        };

        Ok(Self {
            store_a: PathBuf::from(store_a),
            store_b: PathBuf::from(store_b),
            strategy,
            dry_run,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingStore(&'static str),

    #[error("Invalid CALSYNC_STRATEGY: {0}")]
    InvalidStrategy(#[from] calsync_engine::Error),

    #[error("Invalid CALSYNC_DRY_RUN value: '{0}'")]
    InvalidDryRun(String),
}
