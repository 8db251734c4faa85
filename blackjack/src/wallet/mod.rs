//! Wallet module: the balance ledger behind every round.
//!
//! This module implements:
//! - A durable balance per account, mutated only by atomic increments
//! - A read-through balance cache refreshed after every committed increment
//! - In-memory backends with fault injection for development and tests
//!
//! ## Example
//!
//! ```no_run
//! use blackjack::db::{Database, Deadline};
//! use blackjack::wallet::{LedgerStore, PgBalanceStore, RedisBalanceCache, DEFAULT_CACHE_PREFIX};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let store = PgBalanceStore::new(Arc::new(db.pool().clone()));
//!     let cache = RedisBalanceCache::new("redis://127.0.0.1:6379", DEFAULT_CACHE_PREFIX)?;
//!     let ledger = LedgerStore::new(Arc::new(store), Arc::new(cache));
//!
//!     let balance = ledger.apply_delta(1, 200, Deadline::default()).await?;
//!     println!("New balance: {}", balance);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod errors;
pub mod manager;
pub mod memory;
pub mod models;
pub mod store;

pub use cache::{BalanceCache, DEFAULT_CACHE_PREFIX, DEFAULT_CACHE_TTL, RedisBalanceCache};
pub use errors::{CacheError, CacheResult, LedgerError, LedgerResult};
pub use manager::{DEFAULT_STARTING_BALANCE, LedgerStore};
pub use memory::{InMemoryBalanceCache, InMemoryBalanceStore};
pub use models::{AccountId, LedgerEntry, SettlementRecord};
pub use store::{BalanceStore, PgBalanceStore};
