//! Request deadlines against a slow ledger.
//!
//! A request that times out before reaching its round leaves the round as it
//! was. A request that times out after finishing its round still gets the
//! round settled, exactly once.

use blackjack::{
    BlackjackService, Deadline, ErrorKind, InMemoryBalanceCache, InMemoryBalanceStore,
    LedgerStore, Outcome, PayoutConfig, SessionRegistry,
    game::{Card, Deck, Rank, Suit},
};
use std::{sync::Arc, time::Duration};

const LEDGER_LATENCY: Duration = Duration::from_millis(50);

struct SlowTable {
    service: BlackjackService,
    store: Arc<InMemoryBalanceStore>,
}

/// Service over a store that takes [`LEDGER_LATENCY`] per call.
fn slow_table(cards: Vec<Card>) -> SlowTable {
    let store = Arc::new(InMemoryBalanceStore::new().with_latency(LEDGER_LATENCY));
    let ledger = LedgerStore::new(store.clone(), Arc::new(InMemoryBalanceCache::new()));
    let service = BlackjackService::new(
        Arc::new(SessionRegistry::default()),
        Arc::new(ledger),
        PayoutConfig::default(),
    )
    .with_deck_source(move || Deck::stacked(cards.clone()).unwrap_or_default());
    SlowTable { service, store }
}

/// Player 10,7 against dealer 6,5 who then draws 9.
fn losing_deal() -> Vec<Card> {
    vec![
        Card(Rank::Ten, Suit::Heart),
        Card(Rank::Six, Suit::Club),
        Card(Rank::Seven, Suit::Spade),
        Card(Rank::Five, Suit::Diamond),
        Card(Rank::Nine, Suit::Club),
    ]
}

/// Player K,Q against dealer 2,3, player draws 5 and busts.
fn busting_deal() -> Vec<Card> {
    vec![
        Card(Rank::King, Suit::Heart),
        Card(Rank::Two, Suit::Club),
        Card(Rank::Queen, Suit::Spade),
        Card(Rank::Three, Suit::Diamond),
        Card(Rank::Five, Suit::Club),
    ]
}

fn short() -> Deadline {
    Deadline::after(Duration::from_millis(5))
}

/// Wait until the background settlement has reached the store.
async fn settled_balance(store: &InMemoryBalanceStore, account_id: i64, expected: i64) -> i64 {
    for _ in 0..100 {
        if store.balance_of(account_id) == Some(expected) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    store.balance_of(account_id).unwrap_or_default()
}

#[tokio::test]
async fn test_stand_timeout_still_settles_loss() {
    let table = slow_table(losing_deal());
    let service = &table.service;
    service.open_account(1, Deadline::default()).await.unwrap();
    let round = service.new_session(1, Deadline::default()).await.unwrap();

    let err = service
        .stand(round.session_id, 1, short())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    assert_eq!(settled_balance(&table.store, 1, 900).await, 900);

    // The round finished, so a retry is rejected and nothing is debited twice.
    let err = service
        .stand(round.session_id, 1, Deadline::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(
        service.get_balance(1, Deadline::default()).await.unwrap(),
        900
    );
}

#[tokio::test]
async fn test_busting_hit_timeout_still_settles_loss() {
    let table = slow_table(busting_deal());
    let service = &table.service;
    service.open_account(1, Deadline::default()).await.unwrap();
    let round = service.new_session(1, Deadline::default()).await.unwrap();

    let err = service.hit(round.session_id, 1, short()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    assert_eq!(settled_balance(&table.store, 1, 900).await, 900);

    let err = service
        .hit(round.session_id, 1, Deadline::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn test_expired_deadline_leaves_round_playable() {
    let table = slow_table(losing_deal());
    let service = &table.service;
    service.open_account(1, Deadline::default()).await.unwrap();
    let round = service.new_session(1, Deadline::default()).await.unwrap();

    let err = service
        .stand(round.session_id, 1, Deadline::after(Duration::ZERO))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    let err = service
        .hit(round.session_id, 1, Deadline::after(Duration::ZERO))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    // Nothing moved: the same stand with time to spare plays the full round.
    let result = service
        .stand(round.session_id, 1, Deadline::default())
        .await
        .unwrap();
    assert_eq!(result.dealer_total, 20);
    assert_eq!(result.player_total, 17);
    assert_eq!(result.outcome, Outcome::Lose);
    assert_eq!(result.balance, 900);
    assert_eq!(table.store.balance_of(1), Some(900));
}
