use blackjack::{
    BlackjackService, Deadline, InMemoryBalanceCache, InMemoryBalanceStore, LedgerStore,
    PayoutConfig, SessionRegistry,
    game::{Card, Deck, GameSession, Rank, Suit, hand_value},
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::{hint::black_box, sync::Arc};

/// Benchmark hand totals of growing size, all aces (worst case for reduction)
fn bench_hand_value(c: &mut Criterion) {
    let mut group = c.benchmark_group("hand_value");
    for n in [2usize, 4, 8] {
        let cards: Vec<Card> = Suit::ALL
            .iter()
            .cycle()
            .take(n)
            .enumerate()
            .map(|(i, suit)| {
                let rank = if i < 4 { Rank::Ace } else { Rank::Two };
                Card(rank, *suit)
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(n), &cards, |b, cards| {
            b.iter(|| hand_value(black_box(cards)));
        });
    }
    group.finish();
}

/// Benchmark shuffling a full deck
fn bench_shuffle(c: &mut Criterion) {
    c.bench_function("deck_shuffle", |b| {
        b.iter(Deck::shuffled);
    });
}

/// Benchmark dealing and standing one round without the ledger
fn bench_round_state_machine(c: &mut Criterion) {
    c.bench_function("round_deal_and_stand", |b| {
        b.iter(|| {
            let mut session = GameSession::deal(1, Deck::shuffled()).unwrap();
            black_box(session.stand().unwrap());
        });
    });
}

/// Benchmark a full round through the service with in-memory backends
fn bench_service_round(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let ledger = LedgerStore::new(
        Arc::new(InMemoryBalanceStore::new()),
        Arc::new(InMemoryBalanceCache::new()),
    );
    let service = BlackjackService::new(
        Arc::new(SessionRegistry::default()),
        Arc::new(ledger),
        PayoutConfig::default(),
    );

    c.bench_function("service_round", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let round = service.new_session(1, Deadline::default()).await.unwrap();
                let result = service
                    .stand(round.session_id, 1, Deadline::default())
                    .await
                    .unwrap();
                service.registry().remove(round.session_id);
                black_box(result)
            })
        });
    });
}

criterion_group!(
    benches,
    bench_hand_value,
    bench_shuffle,
    bench_round_state_machine,
    bench_service_round
);
criterion_main!(benches);
