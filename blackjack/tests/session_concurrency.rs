//! Concurrency tests for the session registry and the service on top of it.

use blackjack::{
    BlackjackService, Deadline, GameError, InMemoryBalanceCache, InMemoryBalanceStore,
    LedgerStore, PayoutConfig, SessionRegistry,
    game::{Card, Deck, Rank, Suit},
};
use std::{collections::HashSet, sync::Arc};

fn service() -> BlackjackService {
    let ledger = LedgerStore::new(
        Arc::new(InMemoryBalanceStore::new()),
        Arc::new(InMemoryBalanceCache::new()),
    );
    BlackjackService::new(
        Arc::new(SessionRegistry::default()),
        Arc::new(ledger),
        PayoutConfig::default(),
    )
}

// Dealer on 19; the player is dealt eight low cards and never busts.
fn low_deck() -> Deck {
    Deck::stacked([
        Card(Rank::Two, Suit::Club),
        Card(Rank::Ten, Suit::Club),
        Card(Rank::Two, Suit::Diamond),
        Card(Rank::Nine, Suit::Club),
        Card(Rank::Two, Suit::Heart),
        Card(Rank::Two, Suit::Spade),
        Card(Rank::Three, Suit::Club),
        Card(Rank::Three, Suit::Diamond),
        Card(Rank::Three, Suit::Heart),
        Card(Rank::Three, Suit::Spade),
    ])
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_hits_on_one_session_are_linearized() {
    let service = Arc::new(service());
    let registry = service.registry().clone();
    let id = registry.create(1, low_deck()).unwrap();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.hit(id, 1, Deadline::default()).await })
        })
        .collect();

    let mut hand_sizes = HashSet::new();
    for handle in handles {
        let view = handle.await.unwrap().unwrap();
        // Every hit saw a distinct, strictly larger hand.
        assert!(hand_sizes.insert(view.player_cards.len()));
    }
    assert_eq!(hand_sizes, (3..=8).collect::<HashSet<_>>());

    let total = registry
        .with_session(id, |session| Ok(session.player_total()))
        .await
        .unwrap();
    // 2 + 2 + 2 + 2 + 3 + 3 + 3 + 3
    assert_eq!(total, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stands_settle_once() {
    let service = Arc::new(service());
    service.open_account(1, Deadline::default()).await.unwrap();
    let round = service.new_session(1, Deadline::default()).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            let id = round.session_id;
            tokio::spawn(async move { service.stand(id, 1, Deadline::default()).await })
        })
        .collect();

    let mut settled = Vec::new();
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(view) => settled.push(view),
            Err(err) => {
                assert!(matches!(
                    err,
                    blackjack::BlackjackError::Game(GameError::InvalidTransition { .. })
                ));
                rejected += 1;
            }
        }
    }

    assert_eq!(settled.len(), 1);
    assert_eq!(rejected, 7);
    let balance = service.get_balance(1, Deadline::default()).await.unwrap();
    assert_eq!(balance, 1000 + settled[0].delta);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_independent_sessions() {
    let service = Arc::new(service());

    let handles: Vec<_> = (0..200)
        .map(|account| {
            let service = service.clone();
            tokio::spawn(async move {
                service.open_account(account, Deadline::default()).await?;
                let round = service.new_session(account, Deadline::default()).await?;
                let result = service
                    .stand(round.session_id, account, Deadline::default())
                    .await?;
                Ok::<_, blackjack::BlackjackError>((account, result.delta, result.balance))
            })
        })
        .collect();

    for handle in handles {
        let (account, delta, balance) = handle.await.unwrap().unwrap();
        assert_eq!(balance, 1000 + delta, "account {account}");
    }
    assert_eq!(service.active_sessions(), 200);
}
