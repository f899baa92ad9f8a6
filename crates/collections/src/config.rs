//! Sync-layer configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `COPPERLEAF_FEED_CAPACITY` - Per-partition change-feed buffer size
//!   (default: 16, must be at least 1). A lagged feed collapses missed
//!   signals into one full re-read, so small buffers are safe.

use thiserror::Error;

/// Default per-partition change-feed buffer size.
pub const DEFAULT_FEED_CAPACITY: usize = 16;

const FEED_CAPACITY_VAR: &str = "COPPERLEAF_FEED_CAPACITY";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Tuning knobs for the consistency layer.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Broadcast buffer size for each partition's change feed.
    pub feed_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

impl SyncConfig {
    /// Load configuration from the environment, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnvVar`] if a variable is present but
    /// unparseable or out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let feed_capacity = match std::env::var(FEED_CAPACITY_VAR) {
            Ok(raw) => raw.parse::<usize>().map_err(|e| {
                ConfigError::InvalidEnvVar(FEED_CAPACITY_VAR.to_owned(), e.to_string())
            })?,
            Err(_) => DEFAULT_FEED_CAPACITY,
        };
        if feed_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                FEED_CAPACITY_VAR.to_owned(),
                "must be at least 1".to_owned(),
            ));
        }
        Ok(Self { feed_capacity })
    }
}
