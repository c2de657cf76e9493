//! Configuration for the result cache

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest finite TTL accepted: thirty days
pub const MAX_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Freshness policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds an entry stays fresh; zero or negative never expires
    pub ttl_secs: i64,
}

impl CacheConfig {
    /// Entries that never expire by age
    pub fn unlimited() -> Self {
        Self { ttl_secs: 0 }
    }

    /// TTL as a duration, `None` when unlimited
    pub fn ttl(&self) -> Option<Duration> {
        u64::try_from(self.ttl_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Validate the configuration
    ///
    /// Non-positive means unlimited. A positive TTL may not exceed
    /// [`MAX_TTL_SECS`].
    pub fn validate(&self) -> Result<(), String> {
        if self.ttl_secs > MAX_TTL_SECS {
            return Err(format!(
                "ttl_secs must be at most {} (30 days), or 0 to never expire; got {}",
                MAX_TTL_SECS, self.ttl_secs
            ));
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for CacheConfig {
    /// Ten minutes
    fn default() -> Self {
        Self { ttl_secs: 600 }
    }
}
