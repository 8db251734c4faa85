//! Table rules shared by the card model and the round state machine.

/// Cards in a standard deck.
pub const DECK_SIZE: usize = 52;

/// Best possible total; anything above busts.
pub const BLACKJACK: u32 = 21;

/// Difference between an ace counted high (11) and low (1).
pub const SOFT_ACE_REDUCTION: u32 = 10;

/// The dealer keeps drawing while below this total.
pub const DEALER_STANDS_ON: u32 = 17;

/// Cards each party receives on the opening deal.
pub const INITIAL_HAND_SIZE: usize = 2;
