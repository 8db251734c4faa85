//! Cache-aside ledger: durable increments, read-through balance lookups.

use log::{debug, error, info, warn};
use std::{sync::Arc, time::Duration};

use super::{
    cache::{BalanceCache, DEFAULT_CACHE_TTL},
    errors::{CacheError, LedgerError, LedgerResult},
    models::AccountId,
    store::BalanceStore,
};
use crate::db::{Deadline, DeadlineExceeded};

/// Starting grant credited when an account is opened
pub const DEFAULT_STARTING_BALANCE: i64 = 1000;

impl From<DeadlineExceeded> for LedgerError {
    fn from(value: DeadlineExceeded) -> Self {
        LedgerError::Timeout(value.0)
    }
}

impl From<DeadlineExceeded> for CacheError {
    fn from(_: DeadlineExceeded) -> Self {
        CacheError::Timeout
    }
}

/// Ledger store
///
/// Every mutation goes to the durable store as one atomic increment and the
/// cache is then refreshed with the committed value. Reads try the cache and
/// fall back to the store. The cache may lag the store by at most `cache_ttl`.
#[derive(Clone)]
pub struct LedgerStore {
    store: Arc<dyn BalanceStore>,
    cache: Arc<dyn BalanceCache>,
    cache_ttl: Duration,
    starting_balance: i64,
}

impl LedgerStore {
    /// Create a ledger over a durable store and a cache
    ///
    /// # Arguments
    ///
    /// * `store` - Source of truth for balances
    /// * `cache` - Fast path for reads, refreshed after every write
    pub fn new(store: Arc<dyn BalanceStore>, cache: Arc<dyn BalanceCache>) -> Self {
        Self {
            store,
            cache,
            cache_ttl: DEFAULT_CACHE_TTL,
            starting_balance: DEFAULT_STARTING_BALANCE,
        }
    }

    /// Override how long a cached balance may be served
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Override the grant credited by [`LedgerStore::open_account`]
    pub fn with_starting_balance(mut self, starting_balance: i64) -> Self {
        self.starting_balance = starting_balance;
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn starting_balance(&self) -> i64 {
        self.starting_balance
    }

    /// Get balance for an account
    ///
    /// Serves from the cache when possible. A miss, an unreadable entry or a
    /// cache failure reads the durable store instead (an account without a
    /// row has balance 0) and repopulates the cache.
    ///
    /// # Errors
    ///
    /// * `LedgerError::Timeout` - The durable read missed the deadline
    /// * `LedgerError::Database` / `LedgerError::Unavailable` - Store failure
    pub async fn get_balance(&self, account_id: AccountId, deadline: Deadline) -> LedgerResult<i64> {
        match self.read_cache(account_id, deadline).await {
            Ok(Some(balance)) => {
                debug!("balance cache hit for account {account_id}");
                return Ok(balance);
            }
            Ok(None) => debug!("balance cache miss for account {account_id}"),
            Err(err) => warn!("balance cache read failed for account {account_id}: {err}"),
        }

        let balance = deadline
            .run(self.store.fetch_balance(account_id))
            .await
            .map_err(LedgerError::from)
            .and_then(|result| result)
            .inspect_err(|err| error!("balance read failed for account {account_id}: {err}"))?
            .unwrap_or(0);

        self.refresh_cache(account_id, balance, deadline).await;
        Ok(balance)
    }

    /// Apply a signed delta to an account
    ///
    /// The delta is applied by the store as one atomic increment (creating the
    /// row if needed); the cache is never consulted. After the increment
    /// commits the cache entry is overwritten with the new balance. A failed
    /// refresh is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// * `LedgerError::Timeout` - No answer from the store before the deadline
    /// * `LedgerError::Database` / `LedgerError::Unavailable` - Store failure;
    ///   the cache is left untouched
    pub async fn apply_delta(
        &self,
        account_id: AccountId,
        delta: i64,
        deadline: Deadline,
    ) -> LedgerResult<i64> {
        let balance = deadline
            .run(self.store.increment(account_id, delta))
            .await
            .map_err(LedgerError::from)
            .and_then(|result| result)
            .inspect_err(|err| {
                error!("balance increment of {delta} failed for account {account_id}: {err}")
            })?;

        debug!("account {account_id} moved by {delta} to {balance}");
        self.refresh_cache(account_id, balance, deadline).await;
        Ok(balance)
    }

    /// Credit the starting grant to a new account
    pub async fn open_account(&self, account_id: AccountId, deadline: Deadline) -> LedgerResult<i64> {
        let balance = self
            .apply_delta(account_id, self.starting_balance, deadline)
            .await?;
        info!(
            "opened account {account_id} with {} (balance {balance})",
            self.starting_balance
        );
        Ok(balance)
    }

    async fn read_cache(
        &self,
        account_id: AccountId,
        deadline: Deadline,
    ) -> Result<Option<i64>, CacheError> {
        deadline.run(self.cache.get(account_id)).await?
    }

    async fn refresh_cache(&self, account_id: AccountId, balance: i64, deadline: Deadline) {
        let result = match deadline
            .run(self.cache.set(account_id, balance, self.cache_ttl))
            .await
        {
            Ok(result) => result,
            Err(elapsed) => Err(elapsed.into()),
        };

        if let Err(err) = result {
            warn!("balance cache refresh failed for account {account_id}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::memory::{InMemoryBalanceCache, InMemoryBalanceStore};

    fn ledger() -> (LedgerStore, Arc<InMemoryBalanceStore>, Arc<InMemoryBalanceCache>) {
        let store = Arc::new(InMemoryBalanceStore::new());
        let cache = Arc::new(InMemoryBalanceCache::new());
        let ledger = LedgerStore::new(store.clone(), cache.clone());
        (ledger, store, cache)
    }

    #[tokio::test]
    async fn test_missing_account_reads_zero_and_caches_it() {
        let (ledger, store, cache) = ledger();
        assert_eq!(ledger.get_balance(9, Deadline::default()).await.unwrap(), 0);
        assert_eq!(cache.peek(9).as_deref(), Some("0"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_apply_delta_refreshes_cache() {
        let (ledger, _, cache) = ledger();
        ledger.apply_delta(1, 250, Deadline::default()).await.unwrap();
        assert_eq!(cache.peek(1).as_deref(), Some("250"));

        ledger.apply_delta(1, -50, Deadline::default()).await.unwrap();
        assert_eq!(cache.peek(1).as_deref(), Some("200"));
    }

    #[tokio::test]
    async fn test_open_account_grants_starting_balance() {
        let (ledger, store, _) = ledger();
        let ledger = ledger.with_starting_balance(1500);
        assert_eq!(ledger.open_account(3, Deadline::default()).await.unwrap(), 1500);
        assert_eq!(store.balance_of(3), Some(1500));
    }

    #[tokio::test]
    async fn test_read_failure_on_cache_falls_back() {
        let (ledger, store, cache) = ledger();
        store.increment(1, 700).await.unwrap();
        cache.set_failing_reads(true);
        assert_eq!(ledger.get_balance(1, Deadline::default()).await.unwrap(), 700);
    }
}
