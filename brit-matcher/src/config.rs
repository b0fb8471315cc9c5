//! Service configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::throttle::ThrottleConfig;

/// Largest encrypted request accepted by default.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1500;

/// Limits and tuning for [`crate::MatcherService`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Requests longer than this are rejected before decryption.
    pub max_payload_bytes: usize,
    pub cache: CacheConfig,
    pub throttle: ThrottleConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            cache: CacheConfig::default(),
            throttle: ThrottleConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Relaxed throttling for local development.
    pub fn development() -> Self {
        Self {
            throttle: ThrottleConfig::relaxed(),
            ..Self::default()
        }
    }

    pub fn with_throttle(mut self, throttle: ThrottleConfig) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
