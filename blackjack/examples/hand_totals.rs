//! Hand Totals Example
//!
//! Demonstrates soft-ace hand totals and plays one round against the
//! in-memory ledger.

use blackjack::{
    BlackjackService, Deadline, InMemoryBalanceCache, InMemoryBalanceStore, LedgerStore,
    PayoutConfig, SessionRegistry,
    game::{Card, Deck, Hand, Rank, Suit, hand_value},
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Blackjack Hand Totals Example ===\n");

    // Example 1: Aces count 11 until that would bust
    println!("Example 1: Soft and hard totals");
    let hands = vec![
        ("Blackjack", vec![Card(Rank::Ace, Suit::Spade), Card(Rank::King, Suit::Heart)]),
        ("Two aces", vec![Card(Rank::Ace, Suit::Spade), Card(Rank::Ace, Suit::Heart)]),
        (
            "Soft 17 turned hard",
            vec![
                Card(Rank::Ace, Suit::Club),
                Card(Rank::Six, Suit::Diamond),
                Card(Rank::Nine, Suit::Heart),
            ],
        ),
        (
            "Bust",
            vec![
                Card(Rank::King, Suit::Club),
                Card(Rank::Queen, Suit::Diamond),
                Card(Rank::Five, Suit::Heart),
            ],
        ),
    ];

    for (name, cards) in &hands {
        let mut hand = Hand::new();
        cards.iter().for_each(|card| hand.push(*card));
        println!(
            "{name:>20}: {hand} = {} (soft: {}, bust: {})",
            hand_value(cards),
            hand.is_soft(),
            hand.is_bust()
        );
    }

    // Example 2: One round with a shuffled deck
    println!("\n\nExample 2: Playing a round");
    let ledger = LedgerStore::new(
        Arc::new(InMemoryBalanceStore::new()),
        Arc::new(InMemoryBalanceCache::new()),
    );
    let service = BlackjackService::new(
        Arc::new(SessionRegistry::default()),
        Arc::new(ledger),
        PayoutConfig::default(),
    )
    .with_deck_source(Deck::shuffled);

    let account = 1;
    let balance = service.open_account(account, Deadline::default()).await?;
    println!("Opened account {account} with {balance}");

    let round = service.new_session(account, Deadline::default()).await?;
    println!(
        "Player: {:?} = {}, dealer shows {:?}",
        round.player_cards, round.player_total, round.dealer_up_card
    );

    // Simple strategy: draw below 17
    let mut total = round.player_total;
    while total < 17 {
        let hit = service
            .hit(round.session_id, account, Deadline::default())
            .await?;
        total = hit.player_total;
        println!("Hit: {:?} = {total}", hit.player_cards);
        if hit.finished {
            println!("Bust! Balance now {:?}", hit.balance);
            return Ok(());
        }
    }

    let result = service
        .stand(round.session_id, account, Deadline::default())
        .await?;
    println!(
        "Dealer: {:?} = {}\nOutcome: {} ({:+}), balance {}",
        result.dealer_cards, result.dealer_total, result.outcome, result.delta, result.balance
    );

    Ok(())
}
