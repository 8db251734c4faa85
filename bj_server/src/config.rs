//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use blackjack::{
    PayoutConfig, SessionConfig,
    db::{DatabaseConfig, timeouts::DEFAULT_REQUEST_TIMEOUT},
    settlement::{DEFAULT_PAYOUT, DEFAULT_STAKE},
    wallet::{DEFAULT_CACHE_PREFIX, DEFAULT_CACHE_TTL, DEFAULT_STARTING_BALANCE},
};
use std::{net::SocketAddr, time::Duration};

/// Bind address used when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus scrape address, metrics disabled when absent
    pub metrics_bind: Option<SocketAddr>,
    /// Database configuration, balances kept in memory when absent
    pub database: Option<DatabaseConfig>,
    /// Balance cache configuration
    pub cache: CacheConfig,
    /// Session retention
    pub session: SessionConfig,
    /// Round settlement amounts
    pub payouts: PayoutConfig,
    /// Grant credited when an account is opened
    pub starting_balance: i64,
    /// Budget for all ledger I/O of one request
    pub request_timeout: Duration,
}

/// Balance cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis connection URL, in-memory cache when absent
    pub redis_url: Option<String>,
    /// Key prefix for balance entries
    pub prefix: String,
    /// Time-to-live of a cached balance
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            prefix: DEFAULT_CACHE_PREFIX.to_string(),
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `redis_url_override` - Optional Redis URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if an address variable is set but unparsable
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        redis_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND")?.unwrap_or_else(default_bind),
        };
        let metrics_bind = parse_addr("METRICS_BIND")?;

        // Database configuration
        let database = database_url_override
            .or_else(|| non_empty_var("DATABASE_URL"))
            .map(|database_url| DatabaseConfig {
                database_url,
                ..DatabaseConfig::from_env()
            });

        let cache = CacheConfig {
            redis_url: redis_url_override.or_else(|| non_empty_var("REDIS_URL")),
            prefix: std::env::var("BALANCE_CACHE_PREFIX")
                .unwrap_or_else(|_| DEFAULT_CACHE_PREFIX.to_string()),
            ttl: Duration::from_secs(parse_env_or(
                "BALANCE_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL.as_secs(),
            )),
        };

        let defaults = SessionConfig::default();
        let session = SessionConfig {
            idle_ttl: Duration::from_secs(parse_env_or(
                "SESSION_IDLE_TTL_SECS",
                defaults.idle_ttl.as_secs(),
            )),
            finished_retention: Duration::from_secs(parse_env_or(
                "SESSION_FINISHED_RETENTION_SECS",
                defaults.finished_retention.as_secs(),
            )),
            sweep_interval: Duration::from_secs(parse_env_or(
                "SESSION_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval.as_secs(),
            )),
        };

        let payouts = PayoutConfig {
            payout: parse_env_or("PAYOUT_WIN", DEFAULT_PAYOUT),
            stake: parse_env_or("STAKE_LOSE", DEFAULT_STAKE),
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            database,
            cache,
            session,
            payouts,
            starting_balance: parse_env_or("STARTING_BALANCE", DEFAULT_STARTING_BALANCE),
            request_timeout: Duration::from_millis(parse_env_or(
                "REQUEST_TIMEOUT_MS",
                DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            )),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.payouts.payout <= 0 {
            return Err(ConfigError::Invalid {
                var: "PAYOUT_WIN".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.payouts.stake <= 0 {
            return Err(ConfigError::Invalid {
                var: "STAKE_LOSE".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.starting_balance < 0 {
            return Err(ConfigError::Invalid {
                var: "STARTING_BALANCE".to_string(),
                reason: "Must not be negative".to_string(),
            });
        }

        if self.cache.ttl.is_zero() {
            return Err(ConfigError::Invalid {
                var: "BALANCE_CACHE_TTL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "REQUEST_TIMEOUT_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        self.session
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "SESSION_*".to_string(),
                reason,
            })?;

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Parse an optional socket address variable
fn parse_addr(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    non_empty_var(key)
        .map(|value| {
            value.parse().map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("'{value}' is not an IP:PORT address"),
            })
        })
        .transpose()
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ServerConfig {
        ServerConfig {
            bind: DEFAULT_BIND.parse().unwrap(),
            metrics_bind: None,
            database: None,
            cache: CacheConfig::default(),
            session: SessionConfig::default(),
            payouts: PayoutConfig::default(),
            starting_balance: 1000,
            request_timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_default_bind_matches_constant() {
        assert_eq!(default_bind(), DEFAULT_BIND.parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "STAKE_LOSE".to_string(),
            reason: "Must be greater than 0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("STAKE_LOSE"));
        assert!(msg.contains("greater than 0"));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_stake_zero() {
        let config = ServerConfig {
            payouts: PayoutConfig {
                payout: 100,
                stake: 0, // Invalid
            },
            ..valid_config()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "STAKE_LOSE"));
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let config = ServerConfig {
            request_timeout: Duration::ZERO,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_cache_ttl() {
        let config = ServerConfig {
            cache: CacheConfig {
                ttl: Duration::ZERO,
                ..CacheConfig::default()
            },
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_sweep_interval() {
        let config = ServerConfig {
            session: SessionConfig {
                sweep_interval: Duration::ZERO,
                ..SessionConfig::default()
            },
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }
}
