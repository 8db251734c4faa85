//! In-process ledger backends for development and tests.
//!
//! Both backends can be told to fail or to answer slowly, which is how the
//! ledger's degradation paths are exercised without real infrastructure.

use async_trait::async_trait;
use dashmap::DashMap;
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use super::{
    cache::BalanceCache,
    errors::{CacheError, CacheResult, LedgerError, LedgerResult},
    models::AccountId,
    store::BalanceStore,
};

/// `BalanceStore` kept in a sharded map. Per-key entry locking gives the same
/// atomic increment the SQL upsert does.
#[derive(Debug, Default)]
pub struct InMemoryBalanceStore {
    balances: DashMap<AccountId, i64>,
    failing: AtomicBool,
    latency: Option<Duration>,
}

impl InMemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before touching the data.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every call fail with `LedgerError::Unavailable` until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Read the stored balance directly, bypassing everything.
    pub fn balance_of(&self, account_id: AccountId) -> Option<i64> {
        self.balances.get(&account_id).map(|balance| *balance)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    async fn enter(&self) -> LedgerResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BalanceStore for InMemoryBalanceStore {
    async fn fetch_balance(&self, account_id: AccountId) -> LedgerResult<Option<i64>> {
        self.enter().await?;
        Ok(self.balance_of(account_id))
    }

    async fn increment(&self, account_id: AccountId, delta: i64) -> LedgerResult<i64> {
        self.enter().await?;
        let mut balance = self.balances.entry(account_id).or_insert(0);
        let next = balance
            .checked_add(delta)
            .ok_or(LedgerError::BalanceOverflow { account_id, delta })?;
        *balance = next;
        Ok(next)
    }
}

/// `BalanceCache` with per-entry expiry. Entries are stored as raw strings,
/// like Redis, so unreadable values can be planted.
#[derive(Debug, Default)]
pub struct InMemoryBalanceCache {
    entries: DashMap<AccountId, (String, Instant)>,
    failing_reads: AtomicBool,
    failing_writes: AtomicBool,
}

impl InMemoryBalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    /// Store an arbitrary raw value for `account_id`.
    pub fn insert_raw(&self, account_id: AccountId, raw: impl Into<String>, ttl: Duration) {
        self.entries
            .insert(account_id, (raw.into(), Instant::now() + ttl));
    }

    /// Live raw value for `account_id`, ignoring the failure switches.
    pub fn peek(&self, account_id: AccountId) -> Option<String> {
        let now = Instant::now();
        self.entries
            .get(&account_id)
            .filter(|entry| entry.1 > now)
            .map(|entry| entry.0.clone())
    }
}

#[async_trait]
impl BalanceCache for InMemoryBalanceCache {
    async fn get(&self, account_id: AccountId) -> CacheResult<Option<i64>> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("reads switched off".to_string()));
        }

        let now = Instant::now();
        let current = self
            .entries
            .get(&account_id)
            .map(|entry| (entry.0.clone(), entry.1));

        match current {
            None => Ok(None),
            Some((_, expires_at)) if expires_at <= now => {
                self.entries
                    .remove_if(&account_id, |_, (_, expires_at)| *expires_at <= now);
                Ok(None)
            }
            Some((raw, _)) => raw.parse().map(Some).map_err(|_| CacheError::Corrupt {
                key: account_id.to_string(),
                value: raw,
            }),
        }
    }

    async fn set(&self, account_id: AccountId, balance: i64, ttl: Duration) -> CacheResult<()> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("writes switched off".to_string()));
        }
        self.insert_raw(account_id, balance.to_string(), ttl);
        Ok(())
    }
}
