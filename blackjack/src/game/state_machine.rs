//! Blackjack round state machine.
//!
//! A round moves `PlayerTurn -> DealerTurn -> Finished`. Every transition is
//! validated in [`GameSession::apply`]; reaching `Finished` yields exactly one
//! [`TerminalTransition`], which is what settlement consumes.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Instant};
use thiserror::Error;
use uuid::Uuid;

use super::constants::{BLACKJACK, DEALER_STANDS_ON, INITIAL_HAND_SIZE};
use super::entities::{Card, Deck, DeckError, Hand};
use crate::wallet::AccountId;

/// Unguessable identifier of one round.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Player requests that drive a round.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Hit,
    Stand,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Hit => write!(f, "hit"),
            Action::Stand => write!(f, "stand"),
        }
    }
}

/// Result of a finished round from the player's side.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
    Push,
}

impl Outcome {
    /// Compare final totals. A busted player loses even if the dealer busts.
    pub fn decide(player_total: u32, dealer_total: u32) -> Self {
        if player_total > BLACKJACK {
            Outcome::Lose
        } else if dealer_total > BLACKJACK || player_total > dealer_total {
            Outcome::Win
        } else if player_total < dealer_total {
            Outcome::Lose
        } else {
            Outcome::Push
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Lose => write!(f, "lose"),
            Outcome::Push => write!(f, "push"),
        }
    }
}

/// Phase of a round. `Finished` carries its outcome so a finished round
/// without one cannot be represented.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    PlayerTurn,
    DealerTurn,
    Finished { outcome: Outcome },
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Finished { .. })
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::PlayerTurn => write!(f, "player_turn"),
            SessionState::DealerTurn => write!(f, "dealer_turn"),
            SessionState::Finished { outcome } => write!(f, "finished ({outcome})"),
        }
    }
}

/// Errors that can occur while playing a round
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("can't {action} while {state}")]
    InvalidTransition {
        state: SessionState,
        action: Action,
    },
    #[error("invalid game state: deck exhausted")]
    EmptyDeck,
    #[error("invalid deck: {0} dealt twice")]
    DuplicateCard(Card),
}

impl From<DeckError> for GameError {
    fn from(value: DeckError) -> Self {
        match value {
            DeckError::EmptyDeck => GameError::EmptyDeck,
            DeckError::DuplicateCard(card) => GameError::DuplicateCard(card),
        }
    }
}

/// Proof that a round has just entered `Finished`.
///
/// Only the state machine can build one and it is deliberately not `Clone`:
/// settling consumes it, so one terminal transition settles at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct TerminalTransition {
    session_id: SessionId,
    account_id: AccountId,
    outcome: Outcome,
    player_total: u32,
    dealer_total: u32,
}

impl TerminalTransition {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn player_total(&self) -> u32 {
        self.player_total
    }

    pub fn dealer_total(&self) -> u32 {
        self.dealer_total
    }
}

/// What a successful action did to the round.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// Still the player's turn.
    Continue,
    /// The round just finished.
    Finished(TerminalTransition),
}

impl Step {
    pub fn is_finished(&self) -> bool {
        matches!(self, Step::Finished(_))
    }

    pub fn into_terminal(self) -> Option<TerminalTransition> {
        match self {
            Step::Continue => None,
            Step::Finished(terminal) => Some(terminal),
        }
    }
}

/// One round of blackjack between a player and the dealer.
#[derive(Debug)]
pub struct GameSession {
    id: SessionId,
    account_id: AccountId,
    deck: Deck,
    player: Hand,
    dealer: Hand,
    state: SessionState,
    created_at: Instant,
    last_touched: Instant,
    finished_at: Option<Instant>,
}

impl GameSession {
    /// Open a round: player, dealer, player, dealer. The dealer's first
    /// card is the face-up one.
    pub fn deal(account_id: AccountId, mut deck: Deck) -> Result<Self, GameError> {
        let mut player = Hand::new();
        let mut dealer = Hand::new();
        for _ in 0..INITIAL_HAND_SIZE {
            player.push(deck.draw()?);
            dealer.push(deck.draw()?);
        }

        let now = Instant::now();
        Ok(Self {
            id: SessionId::new(),
            account_id,
            deck,
            player,
            dealer,
            state: SessionState::PlayerTurn,
            created_at: now,
            last_touched: now,
            finished_at: None,
        })
    }

    pub fn hit(&mut self) -> Result<Step, GameError> {
        self.apply(Action::Hit)
    }

    /// Standing always ends the round, so the terminal transition is
    /// returned directly.
    pub fn stand(&mut self) -> Result<TerminalTransition, GameError> {
        self.guard(Action::Stand)?;
        let terminal = self.play_dealer();
        self.last_touched = Instant::now();
        Ok(terminal)
    }

    /// Entry point for callers that hold an [`Action`] value.
    pub fn apply(&mut self, action: Action) -> Result<Step, GameError> {
        match action {
            Action::Hit => {
                self.guard(Action::Hit)?;
                let step = self.deal_player()?;
                self.last_touched = Instant::now();
                Ok(step)
            }
            Action::Stand => self.stand().map(Step::Finished),
        }
    }

    /// Every transition starts from `PlayerTurn`.
    fn guard(&self, action: Action) -> Result<(), GameError> {
        match self.state {
            SessionState::PlayerTurn => Ok(()),
            state => Err(GameError::InvalidTransition { state, action }),
        }
    }

    fn deal_player(&mut self) -> Result<Step, GameError> {
        let card = self.deck.draw()?;
        self.player.push(card);
        debug!("session {} player drew {card}", self.id);

        if self.player.is_bust() {
            Ok(Step::Finished(self.finish(Outcome::Lose)))
        } else {
            Ok(Step::Continue)
        }
    }

    fn play_dealer(&mut self) -> TerminalTransition {
        self.state = SessionState::DealerTurn;

        while self.dealer.value() < DEALER_STANDS_ON {
            match self.deck.draw() {
                Ok(card) => self.dealer.push(card),
                Err(_) => {
                    warn!(
                        "session {} deck exhausted with dealer on {}",
                        self.id,
                        self.dealer.value()
                    );
                    break;
                }
            }
        }

        let outcome = Outcome::decide(self.player.value(), self.dealer.value());
        self.finish(outcome)
    }

    /// The only place that enters `Finished`.
    fn finish(&mut self, outcome: Outcome) -> TerminalTransition {
        self.state = SessionState::Finished { outcome };
        self.finished_at = Some(Instant::now());
        TerminalTransition {
            session_id: self.id,
            account_id: self.account_id,
            outcome,
            player_total: self.player.value(),
            dealer_total: self.dealer.value(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            SessionState::Finished { outcome } => Some(outcome),
            _ => None,
        }
    }

    pub fn player_hand(&self) -> &Hand {
        &self.player
    }

    pub fn dealer_hand(&self) -> &Hand {
        &self.dealer
    }

    /// The dealer card the player is allowed to see before standing.
    pub fn dealer_up_card(&self) -> Option<Card> {
        self.dealer.first()
    }

    pub fn player_total(&self) -> u32 {
        self.player.value()
    }

    pub fn dealer_total(&self) -> u32 {
        self.dealer.value()
    }

    pub fn cards_remaining(&self) -> usize {
        self.deck.len()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_touched(&self) -> Instant {
        self.last_touched
    }

    pub fn finished_at(&self) -> Option<Instant> {
        self.finished_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Rank, Suit};

    fn stacked(ranks: &[Rank]) -> Deck {
        // Cycle suits so repeated ranks stay unique.
        let cards = ranks
            .iter()
            .enumerate()
            .map(|(i, rank)| Card(*rank, Suit::ALL[i % 4]));
        Deck::stacked(cards).unwrap()
    }

    #[test]
    fn test_deal_order_and_initial_state() {
        let deck = stacked(&[Rank::Ten, Rank::Six, Rank::Seven, Rank::Five, Rank::Nine]);
        let session = GameSession::deal(7, deck).unwrap();

        let player: Vec<Rank> = session.player_hand().cards().iter().map(Card::rank).collect();
        let dealer: Vec<Rank> = session.dealer_hand().cards().iter().map(Card::rank).collect();
        assert_eq!(player, vec![Rank::Ten, Rank::Seven]);
        assert_eq!(dealer, vec![Rank::Six, Rank::Five]);
        assert_eq!(session.dealer_up_card().map(|c| c.rank()), Some(Rank::Six));
        assert_eq!(session.player_total(), 17);
        assert_eq!(session.state(), SessionState::PlayerTurn);
        assert_eq!(session.account_id(), 7);
        assert_eq!(session.cards_remaining(), 1);
    }

    #[test]
    fn test_deal_from_short_deck_fails() {
        let deck = stacked(&[Rank::Ten, Rank::Six, Rank::Seven]);
        assert_eq!(GameSession::deal(1, deck).unwrap_err(), GameError::EmptyDeck);
    }

    #[test]
    fn test_hit_stays_in_player_turn() {
        let deck = stacked(&[Rank::Two, Rank::Ten, Rank::Three, Rank::Nine, Rank::Four]);
        let mut session = GameSession::deal(1, deck).unwrap();

        let step = session.hit().unwrap();
        assert_eq!(step, Step::Continue);
        assert_eq!(session.player_total(), 9);
        assert_eq!(session.player_hand().len(), 3);
        assert_eq!(session.state(), SessionState::PlayerTurn);
    }

    #[test]
    fn test_hit_bust_finishes_with_loss() {
        let deck = stacked(&[Rank::King, Rank::Two, Rank::Queen, Rank::Three, Rank::Five]);
        let mut session = GameSession::deal(1, deck).unwrap();

        let terminal = session.hit().unwrap().into_terminal().unwrap();
        assert_eq!(terminal.outcome(), Outcome::Lose);
        assert_eq!(terminal.player_total(), 25);
        assert_eq!(terminal.session_id(), session.id());
        assert_eq!(
            session.state(),
            SessionState::Finished {
                outcome: Outcome::Lose
            }
        );
        assert!(session.finished_at().is_some());
    }

    #[test]
    fn test_hit_after_finished_always_invalid() {
        let deck = stacked(&[Rank::King, Rank::Two, Rank::Queen, Rank::Three, Rank::Five]);
        let mut session = GameSession::deal(1, deck).unwrap();
        session.hit().unwrap();

        for _ in 0..5 {
            let err = session.hit().unwrap_err();
            assert!(matches!(
                err,
                GameError::InvalidTransition {
                    action: Action::Hit,
                    ..
                }
            ));
        }
        assert_eq!(session.player_hand().len(), 3);
    }

    #[test]
    fn test_stand_dealer_draws_to_seventeen() {
        // Player 10+7, dealer 6+5 then draws 9 -> 20.
        let deck = stacked(&[
            Rank::Ten,
            Rank::Six,
            Rank::Seven,
            Rank::Five,
            Rank::Nine,
            Rank::Two,
        ]);
        let mut session = GameSession::deal(1, deck).unwrap();

        let terminal = session.stand().unwrap();
        assert_eq!(terminal.dealer_total(), 20);
        assert_eq!(terminal.outcome(), Outcome::Lose);
        assert_eq!(session.dealer_hand().len(), 3);
        assert_eq!(session.cards_remaining(), 1);
    }

    #[test]
    fn test_stand_dealer_bust_is_win() {
        let deck = stacked(&[
            Rank::Ten,
            Rank::Ten,
            Rank::Two,
            Rank::Six,
            Rank::King,
        ]);
        let mut session = GameSession::deal(1, deck).unwrap();

        let terminal = session.stand().unwrap();
        assert_eq!(terminal.dealer_total(), 26);
        assert_eq!(terminal.outcome(), Outcome::Win);
    }

    #[test]
    fn test_stand_equal_totals_push() {
        let deck = stacked(&[Rank::King, Rank::Queen, Rank::Ace, Rank::Ace]);
        let mut session = GameSession::deal(1, deck).unwrap();

        let terminal = session.stand().unwrap();
        assert_eq!(terminal.player_total(), 21);
        assert_eq!(terminal.dealer_total(), 21);
        assert_eq!(terminal.outcome(), Outcome::Push);
    }

    #[test]
    fn test_dealer_stops_on_exhausted_deck() {
        let deck = stacked(&[Rank::Ten, Rank::Two, Rank::Nine, Rank::Three]);
        let mut session = GameSession::deal(1, deck).unwrap();

        let terminal = session.stand().unwrap();
        assert_eq!(terminal.dealer_total(), 5);
        assert_eq!(terminal.outcome(), Outcome::Win);
    }

    #[test]
    fn test_second_stand_is_invalid() {
        let mut session = GameSession::deal(1, Deck::shuffled()).unwrap();
        let terminal = session.stand().unwrap();
        assert_eq!(session.outcome(), Some(terminal.outcome()));

        let err = session.stand().unwrap_err();
        assert!(matches!(
            err,
            GameError::InvalidTransition {
                state: SessionState::Finished { .. },
                action: Action::Stand,
            }
        ));
    }

    #[test]
    fn test_outcome_rules() {
        assert_eq!(Outcome::decide(22, 22), Outcome::Lose);
        assert_eq!(Outcome::decide(22, 17), Outcome::Lose);
        assert_eq!(Outcome::decide(12, 22), Outcome::Win);
        assert_eq!(Outcome::decide(20, 19), Outcome::Win);
        assert_eq!(Outcome::decide(17, 20), Outcome::Lose);
        assert_eq!(Outcome::decide(18, 18), Outcome::Push);
    }

    #[test]
    fn test_session_id_round_trips_through_string() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }
}
