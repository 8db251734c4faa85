//! Balance cache in front of the durable store.
//!
//! Values are decimal strings with a TTL, so an entry can be stale by at most
//! one TTL. Callers treat every error here as a miss.

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{
    errors::{CacheError, CacheResult},
    models::AccountId,
};

/// Default key prefix for balance entries
pub const DEFAULT_CACHE_PREFIX: &str = "blackjack:balance:";

/// Default time-to-live for a cached balance
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Fast, possibly stale side of the ledger
#[async_trait]
pub trait BalanceCache: Send + Sync {
    /// Cached balance, `None` on a miss or expiry
    async fn get(&self, account_id: AccountId) -> CacheResult<Option<i64>>;

    /// Overwrite the cached balance for `ttl`
    async fn set(&self, account_id: AccountId, balance: i64, ttl: Duration) -> CacheResult<()>;
}

/// Redis-backed balance cache
pub struct RedisBalanceCache {
    client: redis::Client,
    connection: Mutex<Option<ConnectionManager>>,
    prefix: String,
}

impl RedisBalanceCache {
    /// Create a cache for `url`. The connection is opened lazily.
    pub fn new(url: &str, prefix: impl Into<String>) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            prefix: prefix.into(),
        })
    }

    fn key(&self, account_id: AccountId) -> String {
        format!("{}{}", self.prefix, account_id)
    }

    /// Shared connection manager. The lock only guards setup; the handle is
    /// cloned out so concurrent calls do not queue behind each other.
    async fn connection(&self) -> CacheResult<ConnectionManager> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_connection_manager().await?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn reset(&self) {
        *self.connection.lock().await = None;
    }
}

#[async_trait]
impl BalanceCache for RedisBalanceCache {
    async fn get(&self, account_id: AccountId) -> CacheResult<Option<i64>> {
        let mut conn = self.connection().await?;
        let key = self.key(account_id);
        let value: Option<String> = match conn.get(&key).await {
            Ok(value) => value,
            Err(err) => {
                self.reset().await;
                return Err(err.into());
            }
        };

        value
            .map(|raw| {
                raw.parse::<i64>()
                    .map_err(|_| CacheError::Corrupt { key, value: raw })
            })
            .transpose()
    }

    async fn set(&self, account_id: AccountId, balance: i64, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let key = self.key(account_id);
        let ttl = ttl.as_secs().max(1);
        let result: redis::RedisResult<()> = conn.set_ex(key, balance.to_string(), ttl).await;
        if let Err(err) = result {
            self.reset().await;
            return Err(err.into());
        }
        Ok(())
    }
}
