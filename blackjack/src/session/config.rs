//! Session retention configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default time a round may sit untouched before it is evicted (30 minutes)
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Default time a finished round stays readable (5 minutes)
pub const DEFAULT_FINISHED_RETENTION: Duration = Duration::from_secs(5 * 60);

/// Default period between eviction sweeps (60 seconds)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Session retention configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Evict a round nobody has acted on for this long
    pub idle_ttl: Duration,

    /// Evict a finished round this long after it finished
    pub finished_retention: Duration,

    /// How often the sweeper runs
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl: DEFAULT_IDLE_TTL,
            finished_retention: DEFAULT_FINISHED_RETENTION,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl SessionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.idle_ttl.is_zero() {
            return Err("Session idle TTL must be greater than zero".to_string());
        }

        if self.finished_retention.is_zero() {
            return Err("Finished session retention must be greater than zero".to_string());
        }

        if self.sweep_interval.is_zero() {
            return Err("Session sweep interval must be greater than zero".to_string());
        }

        Ok(())
    }
}
