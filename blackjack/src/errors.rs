//! Errors surfaced by the service layer.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::db::DeadlineExceeded;
use crate::game::GameError;
use crate::wallet::LedgerError;

/// Coarse failure category, stable across backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SessionNotFound,
    InvalidTransition,
    EmptyDeck,
    InvalidDeck,
    LedgerUnavailable,
    BalanceOverflow,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SessionNotFound => "session_not_found",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::EmptyDeck => "empty_deck",
            ErrorKind::InvalidDeck => "invalid_deck",
            ErrorKind::LedgerUnavailable => "ledger_unavailable",
            ErrorKind::BalanceOverflow => "balance_overflow",
            ErrorKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blackjack service errors
#[derive(Debug, Error)]
pub enum BlackjackError {
    /// Round-level failure
    #[error(transparent)]
    Game(#[from] GameError),

    /// Balance ledger failure
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The request deadline passed
    #[error(transparent)]
    Deadline(#[from] DeadlineExceeded),
}

impl BlackjackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlackjackError::Game(GameError::SessionNotFound(_)) => ErrorKind::SessionNotFound,
            BlackjackError::Game(GameError::InvalidTransition { .. }) => {
                ErrorKind::InvalidTransition
            }
            BlackjackError::Game(GameError::EmptyDeck) => ErrorKind::EmptyDeck,
            BlackjackError::Game(GameError::DuplicateCard(_)) => ErrorKind::InvalidDeck,
            BlackjackError::Ledger(LedgerError::Timeout(_)) | BlackjackError::Deadline(_) => {
                ErrorKind::Timeout
            }
            BlackjackError::Ledger(LedgerError::BalanceOverflow { .. }) => {
                ErrorKind::BalanceOverflow
            }
            BlackjackError::Ledger(LedgerError::Database(_) | LedgerError::Unavailable(_)) => {
                ErrorKind::LedgerUnavailable
            }
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Game errors are safe to show as-is. Ledger errors go through
    /// [`LedgerError::client_message`].
    pub fn client_message(&self) -> String {
        match self {
            BlackjackError::Game(GameError::SessionNotFound(_)) => {
                "Session not found".to_string()
            }
            BlackjackError::Game(err) => err.to_string(),
            BlackjackError::Ledger(err) => err.client_message(),
            BlackjackError::Deadline(_) => "Request timed out".to_string(),
        }
    }
}

/// Result type for service operations
pub type BlackjackResult<T> = Result<T, BlackjackError>;
