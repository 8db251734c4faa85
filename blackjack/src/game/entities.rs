use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashSet, VecDeque},
    fmt,
};

use super::constants::{BLACKJACK, DECK_SIZE, SOFT_ACE_REDUCTION};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Blackjack value before soft-ace reduction. Aces count 11.
    pub const fn value(self) -> u32 {
        match self {
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten | Self::Jack | Self::Queen | Self::King => 10,
            Self::Ace => 11,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Jack => "J".to_string(),
            Self::Queen => "Q".to_string(),
            Self::King => "K".to_string(),
            Self::Ace => "A".to_string(),
            pip => pip.value().to_string(),
        };
        write!(f, "{repr}")
    }
}

/// A card is a rank and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Rank, pub Suit);

impl Card {
    pub const fn rank(&self) -> Rank {
        self.0
    }

    pub const fn suit(&self) -> Suit {
        self.1
    }

    pub const fn value(&self) -> u32 {
        self.0.value()
    }

    pub const fn is_ace(&self) -> bool {
        matches!(self.0, Rank::Ace)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = format!("{}/{}", self.0, self.1);
        write!(f, "{repr:>4}")
    }
}

/// Errors raised by the card model itself.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, thiserror::Error)]
pub enum DeckError {
    #[error("deck is empty")]
    EmptyDeck,
    #[error("card {0} appears twice in the deck")]
    DuplicateCard(Card),
}

/// Cards left to deal in one round. Consumed from the front and never
/// reshuffled once the round has started.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: VecDeque<Card>,
}

impl Deck {
    /// All 52 cards in suit-major order.
    pub fn ordered() -> Self {
        let mut cards = VecDeque::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push_back(Card(rank, suit));
            }
        }
        Self { cards }
    }

    /// A freshly shuffled 52 card deck (Fisher-Yates over the thread RNG).
    pub fn shuffled() -> Self {
        let mut cards: Vec<Card> = Self::ordered().cards.into();
        cards.shuffle(&mut rand::rng());
        Self {
            cards: cards.into(),
        }
    }

    /// Deck dealt in exactly the given order. Used for replays and
    /// deterministic rounds; may hold fewer than 52 cards.
    pub fn stacked<I>(cards: I) -> Result<Self, DeckError>
    where
        I: IntoIterator<Item = Card>,
    {
        let mut seen = HashSet::with_capacity(DECK_SIZE);
        let mut deck = VecDeque::with_capacity(DECK_SIZE);
        for card in cards {
            if !seen.insert(card) {
                return Err(DeckError::DuplicateCard(card));
            }
            deck.push_back(card);
        }
        Ok(Self { cards: deck })
    }

    pub fn draw(&mut self) -> Result<Card, DeckError> {
        self.cards.pop_front().ok_or(DeckError::EmptyDeck)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::shuffled()
    }
}

/// Minimal legal blackjack total: aces count 11 until the hand would bust,
/// then drop to 1 one at a time.
pub fn hand_value(cards: &[Card]) -> u32 {
    reduce(cards).0
}

/// Total plus the number of aces still counted as 11.
fn reduce(cards: &[Card]) -> (u32, usize) {
    let mut total: u32 = cards.iter().map(Card::value).sum();
    let mut soft_aces = cards.iter().filter(|card| card.is_ace()).count();
    while total > BLACKJACK && soft_aces > 0 {
        total -= SOFT_ACE_REDUCTION;
        soft_aces -= 1;
    }
    (total, soft_aces)
}

/// Cards dealt to one party.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self {
            cards: Vec::with_capacity(4),
        }
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn first(&self) -> Option<Card> {
        self.cards.first().copied()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn value(&self) -> u32 {
        hand_value(&self.cards)
    }

    /// Whether an ace is still being counted as 11.
    pub fn is_soft(&self) -> bool {
        reduce(&self.cards).1 > 0
    }

    pub fn is_bust(&self) -> bool {
        self.value() > BLACKJACK
    }
}

impl From<Vec<Card>> for Hand {
    fn from(cards: Vec<Card>) -> Self {
        Self { cards }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cards = self
            .cards
            .iter()
            .map(|card| card.to_string().trim_start().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "[{cards}] = {}", self.value())
    }
}
