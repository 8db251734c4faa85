/// Property-based tests for hand totals and decks using proptest
///
/// These tests check the soft-ace reduction and the deck invariants
/// across a wide range of randomly generated card combinations.
use blackjack::game::{
    Card, Deck, DeckError, Hand, Rank, Suit, hand_value,
    constants::{BLACKJACK, DECK_SIZE},
};
use proptest::prelude::*;
use std::collections::HashSet;

// Every card of the standard deck, in a fixed order
fn all_cards() -> Vec<Card> {
    Rank::ALL
        .iter()
        .flat_map(|rank| Suit::ALL.iter().map(move |suit| Card(*rank, *suit)))
        .collect()
}

// Strategy to generate a vec of unique cards in random order
fn unique_cards_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<Card>> {
    prop::sample::subsequence(all_cards(), min..=max).prop_shuffle()
}

// Total with every ace counted as 1
fn hard_total(cards: &[Card]) -> u32 {
    cards
        .iter()
        .map(|card| if card.is_ace() { 1 } else { card.value() })
        .sum()
}

proptest! {
    #[test]
    fn test_value_between_hard_and_raw_total(cards in unique_cards_strategy(0, 12)) {
        let value = hand_value(&cards);
        let raw: u32 = cards.iter().map(Card::value).sum();

        prop_assert!(value >= hard_total(&cards), "aces never count below 1");
        prop_assert!(value <= raw, "reduction never adds points");
    }

    #[test]
    fn test_value_is_minimal_legal_total(cards in unique_cards_strategy(0, 12)) {
        let value = hand_value(&cards);
        let aces = cards.iter().filter(|card| card.is_ace()).count() as u32;
        let hard = hard_total(&cards);

        // The best total is the largest hard + 10k (k <= aces) not over 21,
        // or the hard total when even that busts.
        let best = (0..=aces)
            .map(|k| hard + 10 * k)
            .filter(|total| *total <= BLACKJACK)
            .max()
            .unwrap_or(hard);
        prop_assert_eq!(value, best);
    }

    #[test]
    fn test_value_ignores_card_order(mut cards in unique_cards_strategy(0, 10)) {
        let value = hand_value(&cards);
        cards.reverse();
        prop_assert_eq!(hand_value(&cards), value);
    }

    #[test]
    fn test_soft_hand_never_busts(cards in unique_cards_strategy(1, 10)) {
        let hand = Hand::from(cards);
        if hand.is_soft() {
            prop_assert!(!hand.is_bust());
            prop_assert!(hand.value() >= 11);
        }
    }

    #[test]
    fn test_stacked_deck_deals_in_order(cards in unique_cards_strategy(0, DECK_SIZE)) {
        let mut deck = Deck::stacked(cards.clone()).unwrap();
        prop_assert_eq!(deck.len(), cards.len());

        for expected in &cards {
            prop_assert_eq!(deck.draw().unwrap(), *expected);
        }
        prop_assert_eq!(deck.draw(), Err(DeckError::EmptyDeck));
    }
}

#[test]
fn test_shuffled_decks_are_complete_and_unique() {
    for _ in 0..20 {
        let mut deck = Deck::shuffled();
        let mut seen = HashSet::new();
        while let Ok(card) = deck.draw() {
            assert!(seen.insert(card), "card {card} dealt twice");
        }
        assert_eq!(seen.len(), DECK_SIZE);
    }
}
