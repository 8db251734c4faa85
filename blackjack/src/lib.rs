//! # Blackjack
//!
//! A single-hand blackjack engine (player against dealer) settled against a
//! shared balance ledger.
//!
//! Each round is a small state machine: it is dealt in `PlayerTurn`, moves
//! to `DealerTurn` on a stand and ends in `Finished` with an outcome. Rounds
//! live in a concurrent registry where requests for the same round are
//! serialized and unrelated rounds never wait on each other.
//!
//! Finishing a round yields a move-only terminal transition. Settlement
//! consumes it and applies one signed delta to the ledger, which keeps the
//! durable balance in PostgreSQL and a bounded-staleness copy in Redis.
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, decks, hand totals and the round state machine
//! - [`session`]: Registry of live rounds with TTL eviction
//! - [`wallet`]: Balance ledger (durable store plus cache)
//! - [`settlement`]: Outcome to balance delta
//! - [`service`]: The operations a transport exposes
//! - [`db`]: Connection pool, migrations and request deadlines
//!
//! ## Example
//!
//! ```
//! use blackjack::{
//!     BlackjackService, Deadline, InMemoryBalanceCache, InMemoryBalanceStore, LedgerStore,
//!     PayoutConfig, SessionRegistry,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = LedgerStore::new(
//!     Arc::new(InMemoryBalanceStore::new()),
//!     Arc::new(InMemoryBalanceCache::new()),
//! );
//! let service = BlackjackService::new(
//!     Arc::new(SessionRegistry::default()),
//!     Arc::new(ledger),
//!     PayoutConfig::default(),
//! );
//!
//! service.open_account(1, Deadline::default()).await?;
//! let round = service.new_session(1, Deadline::default()).await?;
//! let result = service.stand(round.session_id, 1, Deadline::default()).await?;
//! println!("{} -> balance {}", result.outcome, result.balance);
//! # Ok(())
//! # }
//! ```

/// Database connection pool, migrations and deadlines.
pub mod db;

/// Service-level error type.
pub mod errors;

/// Card model and round state machine.
pub mod game;

/// Transport-facing operations.
pub mod service;

/// Live round registry.
pub mod session;

/// Outcome settlement.
pub mod settlement;

/// Balance ledger.
pub mod wallet;

pub use db::Deadline;
pub use errors::{BlackjackError, BlackjackResult, ErrorKind};
pub use game::{
    Action, Card, Deck, GameError, GameSession, Outcome, SessionId, SessionState,
    constants::{self, BLACKJACK, DEALER_STANDS_ON},
    entities::{self, hand_value},
};
pub use service::{BlackjackService, HitView, NewSessionView, StandView};
pub use session::{SessionConfig, SessionRegistry};
pub use settlement::{PayoutConfig, SettlementCoordinator, SettlementReceipt};
pub use wallet::{
    AccountId, InMemoryBalanceCache, InMemoryBalanceStore, LedgerError, LedgerStore,
};
