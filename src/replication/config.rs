//! Replica configuration
//!
//! Loaded once (file or defaults), validated, then immutable. Every
//! replica of a pair is built from the same configuration.
//!
//! All durations are milliseconds on the caller's clock.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Replica timing and retention configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplicaConfig {
    /// How often the primary sends heartbeats
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Silence after which the peer is presumed dead
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,

    /// Recovery time objective for a failover
    #[serde(default = "default_rto_ms")]
    pub rto_ms: u64,

    /// Largest tolerated primary/secondary LSN difference
    #[serde(default = "default_max_replication_lag")]
    pub max_replication_lag: u64,

    /// Retention limit of each log
    #[serde(default = "default_max_log_entries")]
    pub max_log_entries: usize,

    /// Most entries shipped in one replication request
    #[serde(default = "default_max_batch_entries")]
    pub max_batch_entries: usize,

    /// Oldest replication request a target still accepts
    #[serde(default = "default_replication_timeout_ms")]
    pub replication_timeout_ms: u64,
}

fn default_heartbeat_interval_ms() -> u64 {
    1_000
}
fn default_heartbeat_timeout_ms() -> u64 {
    5_000
}
fn default_rto_ms() -> u64 {
    5_000
}
fn default_max_replication_lag() -> u64 {
    100
}
fn default_max_log_entries() -> usize {
    100_000
}
fn default_max_batch_entries() -> usize {
    256
}
fn default_replication_timeout_ms() -> u64 {
    10_000
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            rto_ms: default_rto_ms(),
            max_replication_lag: default_max_replication_lag(),
            max_log_entries: default_max_log_entries(),
            max_batch_entries: default_max_batch_entries(),
            replication_timeout_ms: default_replication_timeout_ms(),
        }
    }
}

impl ReplicaConfig {
    /// Load and validate a JSON configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: ReplicaConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let nonzero = [
            ("heartbeat_interval_ms", self.heartbeat_interval_ms),
            ("heartbeat_timeout_ms", self.heartbeat_timeout_ms),
            ("rto_ms", self.rto_ms),
            ("replication_timeout_ms", self.replication_timeout_ms),
            ("max_log_entries", self.max_log_entries as u64),
            ("max_batch_entries", self.max_batch_entries as u64),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be > 0", name)));
            }
        }

        if self.heartbeat_timeout_ms <= self.heartbeat_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "heartbeat_timeout_ms ({}) must exceed heartbeat_interval_ms ({})",
                self.heartbeat_timeout_ms, self.heartbeat_interval_ms
            )));
        }

        if self.max_batch_entries > self.max_log_entries {
            return Err(ConfigError::Invalid(format!(
                "max_batch_entries ({}) must not exceed max_log_entries ({})",
                self.max_batch_entries, self.max_log_entries
            )));
        }

        Ok(())
    }
}
