//! Blackjack round engine - card model and per-round state machine.
//!
//! This module provides:
//! - Immutable card, deck and hand types with soft-ace aware totals
//! - A closed set of round states with centrally validated transitions
//! - Move-only terminal transitions handed to settlement

pub mod constants;
pub mod entities;
pub mod state_machine;

pub use entities::{Card, Deck, DeckError, Hand, Rank, Suit, hand_value};
pub use state_machine::{
    Action, GameError, GameSession, Outcome, SessionId, SessionState, Step, TerminalTransition,
};
