//! Controller configuration
//!
//! Read once at construction and static thereafter; only rule cooldowns
//! are runtime-mutable, through the adaptive tuner. Hosts may ship a
//! JSON config; missing fields fall back to the defaults below.

use crate::bucket::{DEFAULT_CAPACITY, DEFAULT_REFILL_PER_SEC};
use crate::cache::DEFAULT_TTL_MINUTES;
use crate::cooldown::DEFAULT_COOLDOWN_MS;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub bucket_capacity: f64,
    pub refill_rate_per_sec: f64,
    /// Fallback window for priorities no rule carries
    pub default_cooldown_ms: i64,
    pub cache_ttl_minutes: i64,
    pub sweep_interval_secs: u64,
    pub drain_interval_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            bucket_capacity: DEFAULT_CAPACITY,
            refill_rate_per_sec: DEFAULT_REFILL_PER_SEC,
            default_cooldown_ms: DEFAULT_COOLDOWN_MS,
            cache_ttl_minutes: DEFAULT_TTL_MINUTES,
            sweep_interval_secs: 300,
            drain_interval_secs: 1,
        }
    }
}

impl ControllerConfig {
    /// Parse a JSON config; unspecified fields keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket_capacity <= 0.0 {
            bail!("bucket_capacity must be positive");
        }
        if self.refill_rate_per_sec <= 0.0 {
            bail!("refill_rate_per_sec must be positive");
        }
        if self.default_cooldown_ms <= 0 {
            bail!("default_cooldown_ms must be positive");
        }
        if self.cache_ttl_minutes <= 0 {
            bail!("cache_ttl_minutes must be positive");
        }
        if self.sweep_interval_secs == 0 {
            bail!("sweep_interval_secs must be positive");
        }
        if self.drain_interval_secs == 0 {
            bail!("drain_interval_secs must be positive");
        }
        Ok(())
    }
}
