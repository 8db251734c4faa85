//! Settlement: turning a finished round into a balance movement.

use chrono::Utc;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use crate::db::{DEFAULT_QUERY_TIMEOUT, Deadline};
use crate::errors::BlackjackResult;
use crate::game::{Outcome, TerminalTransition};
use crate::wallet::{LedgerError, LedgerResult, LedgerStore, SettlementRecord};

/// Default credit for a won round
pub const DEFAULT_PAYOUT: i64 = 100;

/// Default debit for a lost round
pub const DEFAULT_STAKE: i64 = 100;

/// Least time a detached settlement gets to reach the ledger
pub const SETTLEMENT_TIMEOUT: Duration = DEFAULT_QUERY_TIMEOUT;

/// Amounts moved by a settled round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutConfig {
    /// Credited on a win
    pub payout: i64,

    /// Debited on a loss
    pub stake: i64,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            payout: DEFAULT_PAYOUT,
            stake: DEFAULT_STAKE,
        }
    }
}

impl PayoutConfig {
    /// Signed balance delta for `outcome`
    pub fn delta(&self, outcome: Outcome) -> i64 {
        match outcome {
            Outcome::Win => self.payout,
            Outcome::Lose => -self.stake,
            Outcome::Push => 0,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.payout <= 0 {
            return Err("Payout must be positive".to_string());
        }

        if self.stake <= 0 {
            return Err("Stake must be positive".to_string());
        }

        Ok(())
    }
}

/// A settled round and the balance it left behind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementReceipt {
    pub record: SettlementRecord,
    pub balance: i64,
}

/// Applies each terminal transition to the ledger exactly once
#[derive(Clone)]
pub struct SettlementCoordinator {
    ledger: Arc<LedgerStore>,
    payouts: PayoutConfig,
}

impl SettlementCoordinator {
    pub fn new(ledger: Arc<LedgerStore>, payouts: PayoutConfig) -> Self {
        Self { ledger, payouts }
    }

    pub fn payouts(&self) -> &PayoutConfig {
        &self.payouts
    }

    /// Settle a finished round
    ///
    /// Consumes the transition, so a round can only be settled once. A push
    /// still goes through the ledger with a zero delta, which yields the
    /// current balance for the caller.
    ///
    /// # Errors
    ///
    /// * `LedgerError` - The delta was not applied; the round stays finished
    pub async fn settle(
        &self,
        terminal: TerminalTransition,
        deadline: Deadline,
    ) -> LedgerResult<SettlementReceipt> {
        let outcome = terminal.outcome();
        let delta = self.payouts.delta(outcome);
        let balance = self
            .ledger
            .apply_delta(terminal.account_id(), delta, deadline)
            .await?;

        let record = SettlementRecord {
            session_id: terminal.session_id(),
            account_id: terminal.account_id(),
            outcome,
            delta,
            settled_at: Utc::now(),
        };
        info!(
            "settled session {} for account {}: {outcome} ({delta:+}), balance {balance}",
            record.session_id, record.account_id
        );

        Ok(SettlementReceipt { record, balance })
    }

    /// Settle a finished round on its own task
    ///
    /// Once a round is finished its delta has to land whether or not the
    /// caller is still waiting. The ledger write gets the rest of
    /// `deadline` or [`SETTLEMENT_TIMEOUT`], whichever is longer; only the
    /// wait for the receipt is bounded by `deadline`.
    ///
    /// # Errors
    ///
    /// * `BlackjackError::Deadline` - The caller stopped waiting; the write
    ///   carries on in the background
    /// * `BlackjackError::Ledger` - The delta was not applied
    pub async fn settle_detached(
        &self,
        terminal: TerminalTransition,
        deadline: Deadline,
    ) -> BlackjackResult<SettlementReceipt> {
        let session_id = terminal.session_id();
        let budget = deadline.remaining().max(SETTLEMENT_TIMEOUT);
        let coordinator = self.clone();
        let task = tokio::spawn(async move {
            coordinator
                .settle(terminal, Deadline::after(budget))
                .await
                .inspect_err(|e| error!("settlement of session {session_id} failed: {e}"))
        });

        match deadline.run(task).await {
            Ok(Ok(receipt)) => Ok(receipt?),
            Ok(Err(join_error)) => {
                error!("settlement task for session {session_id} died: {join_error}");
                let message = format!("settlement task failed: {join_error}");
                Err(LedgerError::Unavailable(message).into())
            }
            Err(expired) => {
                warn!(
                    "request for session {session_id} timed out, settlement continues in background"
                );
                Err(expired.into())
            }
        }
    }
}
