//! Durable balance storage.
//!
//! The store is the source of truth for every balance. Increments are a
//! single atomic statement; nothing here reads a balance and writes it back.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;

use super::{
    errors::{LedgerError, LedgerResult},
    models::{AccountId, LedgerEntry},
};

/// SQLSTATE raised when `bigint` arithmetic leaves the i64 range
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Durable side of the ledger
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Current balance, `None` when the account has no row yet
    async fn fetch_balance(&self, account_id: AccountId) -> LedgerResult<Option<i64>>;

    /// Atomically add `delta` (creating the row with `delta` if missing) and
    /// return the committed balance
    async fn increment(&self, account_id: AccountId, delta: i64) -> LedgerResult<i64>;
}

/// PostgreSQL implementation of `BalanceStore` over the `wallets` table
#[derive(Clone)]
pub struct PgBalanceStore {
    pool: Arc<PgPool>,
}

impl PgBalanceStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Full row for an account, used by admin tooling and tests
    pub async fn fetch_entry(&self, account_id: AccountId) -> LedgerResult<Option<LedgerEntry>> {
        let row = sqlx::query("SELECT account_id, balance FROM wallets WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(|r| LedgerEntry {
            account_id: r.get("account_id"),
            balance: r.get("balance"),
        }))
    }
}

#[async_trait]
impl BalanceStore for PgBalanceStore {
    async fn fetch_balance(&self, account_id: AccountId) -> LedgerResult<Option<i64>> {
        let row = sqlx::query("SELECT balance FROM wallets WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(|r| r.get("balance")))
    }

    async fn increment(&self, account_id: AccountId, delta: i64) -> LedgerResult<i64> {
        // Insert-or-add in one statement so concurrent deltas serialize on the row lock
        let row = sqlx::query(
            r#"
            INSERT INTO wallets (account_id, balance, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (account_id)
            DO UPDATE SET
                balance = wallets.balance + EXCLUDED.balance,
                updated_at = NOW()
            RETURNING balance
            "#,
        )
        .bind(account_id)
        .bind(delta)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err)
                if db_err.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) =>
            {
                LedgerError::BalanceOverflow { account_id, delta }
            }
            _ => LedgerError::Database(e),
        })?;

        Ok(row.get("balance"))
    }
}
