//! Ledger data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::{Outcome, SessionId};

/// Account ID type
pub type AccountId = i64;

/// Durable balance row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub account_id: AccountId,
    pub balance: i64,
}

/// A round outcome turned into a balance movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub session_id: SessionId,
    pub account_id: AccountId,
    pub outcome: Outcome,
    pub delta: i64,
    pub settled_at: DateTime<Utc>,
}
