//! Ledger error types.

use std::time::Duration;
use thiserror::Error;

use super::models::AccountId;

/// Durable store errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store could not be reached (non-SQL backends)
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// Deadline expired before the store answered
    #[error("Ledger operation timed out after {0:?}")]
    Timeout(Duration),

    /// Applying the delta would overflow the balance
    #[error("Balance overflow for account {account_id} applying {delta}")]
    BalanceOverflow { account_id: AccountId, delta: i64 },
}

impl LedgerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LedgerError::Timeout(_))
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database errors are sanitized to prevent information disclosure about
    /// the internal system structure, and account IDs are redacted.
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::Database(_) | LedgerError::Unavailable(_) => {
                "Ledger temporarily unavailable".to_string()
            }
            LedgerError::BalanceOverflow { .. } => "Balance overflow".to_string(),
            LedgerError::Timeout(_) => self.to_string(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Balance cache errors. These never leave the ledger: every one of them
/// degrades to a durable read or a skipped refresh.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Entry exists but does not hold an integer balance
    #[error("Unreadable cache entry {key}: {value:?}")]
    Corrupt { key: String, value: String },

    /// Cache backend could not be reached
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Deadline expired before the cache answered
    #[error("Cache operation timed out")]
    Timeout,
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
