//! Blackjack service: the operations exposed to transports.
//!
//! Every operation takes the [`Deadline`] of the inbound request; all ledger
//! I/O made on its behalf is bounded by it. A request whose deadline passes
//! before it reaches its round leaves the round untouched. Once a round is
//! finished its settlement runs to completion even if the request times out.

use log::{debug, error, info};
use serde::Serialize;
use std::sync::Arc;

use crate::db::Deadline;
use crate::errors::{BlackjackError, BlackjackResult};
use crate::game::{Action, Card, Deck, GameError, GameSession, Outcome, SessionId};
use crate::session::SessionRegistry;
use crate::settlement::{PayoutConfig, SettlementCoordinator};
use crate::wallet::{AccountId, LedgerStore};

/// Produces the deck for each new round
pub type DeckSource = Arc<dyn Fn() -> Deck + Send + Sync>;

/// A freshly dealt round as the player sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSessionView {
    pub session_id: SessionId,
    pub player_cards: Vec<Card>,
    pub dealer_up_card: Option<Card>,
    pub player_total: u32,
    pub balance: i64,
}

/// The player's hand after a hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitView {
    pub session_id: SessionId,
    pub player_cards: Vec<Card>,
    pub player_total: u32,
    pub finished: bool,
    /// Set when the hit busted the player
    pub outcome: Option<Outcome>,
    /// Balance after the bust was settled
    pub balance: Option<i64>,
}

/// A finished round after the dealer played out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandView {
    pub session_id: SessionId,
    pub dealer_cards: Vec<Card>,
    pub dealer_total: u32,
    pub player_total: u32,
    pub outcome: Outcome,
    pub delta: i64,
    pub balance: i64,
}

/// Blackjack service
#[derive(Clone)]
pub struct BlackjackService {
    registry: Arc<SessionRegistry>,
    ledger: Arc<LedgerStore>,
    settlement: SettlementCoordinator,
    deck_source: DeckSource,
}

impl BlackjackService {
    /// Create a service dealing from freshly shuffled decks
    pub fn new(
        registry: Arc<SessionRegistry>,
        ledger: Arc<LedgerStore>,
        payouts: PayoutConfig,
    ) -> Self {
        let settlement = SettlementCoordinator::new(ledger.clone(), payouts);
        Self {
            registry,
            ledger,
            settlement,
            deck_source: Arc::new(Deck::shuffled),
        }
    }

    /// Replace the deck every new round is dealt from
    pub fn with_deck_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> Deck + Send + Sync + 'static,
    {
        self.deck_source = Arc::new(source);
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<LedgerStore> {
        &self.ledger
    }

    pub fn payouts(&self) -> &PayoutConfig {
        self.settlement.payouts()
    }

    /// Deal a new round for `account_id`
    ///
    /// The balance is read first so a ledger outage does not leave an
    /// unreachable round behind.
    pub async fn new_session(
        &self,
        account_id: AccountId,
        deadline: Deadline,
    ) -> BlackjackResult<NewSessionView> {
        let balance = self.ledger.get_balance(account_id, deadline).await?;

        let session = GameSession::deal(account_id, (self.deck_source)())
            .inspect_err(|err| error!("failed to deal for account {account_id}: {err}"))?;
        let view = NewSessionView {
            session_id: session.id(),
            player_cards: session.player_hand().cards().to_vec(),
            dealer_up_card: session.dealer_up_card(),
            player_total: session.player_total(),
            balance,
        };
        self.registry.insert(session);

        info!(
            "account {account_id} opened session {} on {}",
            view.session_id, view.player_total
        );
        Ok(view)
    }

    /// Draw one card for the player
    ///
    /// A bust finishes the round and settles the loss before returning.
    pub async fn hit(
        &self,
        session_id: SessionId,
        account_id: AccountId,
        deadline: Deadline,
    ) -> BlackjackResult<HitView> {
        let (step, mut view) = self
            .act(
                session_id,
                account_id,
                Action::Hit,
                deadline,
                GameSession::hit,
                |session| HitView {
                    session_id,
                    player_cards: session.player_hand().cards().to_vec(),
                    player_total: session.player_total(),
                    finished: session.is_finished(),
                    outcome: session.outcome(),
                    balance: None,
                },
            )
            .await?;

        if let Some(terminal) = step.into_terminal() {
            let receipt = self.settlement.settle_detached(terminal, deadline).await?;
            view.balance = Some(receipt.balance);
        }
        Ok(view)
    }

    /// End the player's turn, play the dealer out and settle
    ///
    /// If the ledger rejects the settlement the round still stays finished;
    /// a retried stand gets `InvalidTransition`.
    pub async fn stand(
        &self,
        session_id: SessionId,
        account_id: AccountId,
        deadline: Deadline,
    ) -> BlackjackResult<StandView> {
        let (terminal, (dealer_cards, dealer_total, player_total)) = self
            .act(
                session_id,
                account_id,
                Action::Stand,
                deadline,
                GameSession::stand,
                |session| {
                    (
                        session.dealer_hand().cards().to_vec(),
                        session.dealer_total(),
                        session.player_total(),
                    )
                },
            )
            .await?;

        let receipt = self.settlement.settle_detached(terminal, deadline).await?;

        Ok(StandView {
            session_id,
            dealer_cards,
            dealer_total,
            player_total,
            outcome: receipt.record.outcome,
            delta: receipt.record.delta,
            balance: receipt.balance,
        })
    }

    pub async fn get_balance(
        &self,
        account_id: AccountId,
        deadline: Deadline,
    ) -> BlackjackResult<i64> {
        Ok(self.ledger.get_balance(account_id, deadline).await?)
    }

    /// Credit the starting grant to a newly registered account
    pub async fn open_account(
        &self,
        account_id: AccountId,
        deadline: Deadline,
    ) -> BlackjackResult<i64> {
        Ok(self.ledger.open_account(account_id, deadline).await?)
    }

    /// Administrative balance correction
    pub async fn adjust_balance(
        &self,
        account_id: AccountId,
        delta: i64,
        deadline: Deadline,
    ) -> BlackjackResult<i64> {
        let balance = self.ledger.apply_delta(account_id, delta, deadline).await?;
        info!("adjusted account {account_id} by {delta:+}, balance {balance}");
        Ok(balance)
    }

    pub fn active_sessions(&self) -> usize {
        self.registry.len()
    }

    /// Run `transition` on a round owned by `account_id` and snapshot it
    /// while still holding the round's lock.
    async fn act<S, T, F, G>(
        &self,
        session_id: SessionId,
        account_id: AccountId,
        action: Action,
        deadline: Deadline,
        transition: F,
        snapshot: G,
    ) -> BlackjackResult<(S, T)>
    where
        F: FnOnce(&mut GameSession) -> Result<S, GameError>,
        G: FnOnce(&GameSession) -> T,
    {
        let result = self
            .registry
            .with_session_until(session_id, deadline, |session| -> BlackjackResult<_> {
                if session.account_id() != account_id {
                    debug!("account {account_id} does not own session {session_id}");
                    return Err(GameError::SessionNotFound(session_id).into());
                }
                let step = transition(session)?;
                Ok((step, snapshot(&*session)))
            })
            .await;

        if let Err(BlackjackError::Game(GameError::EmptyDeck)) = result {
            error!("session {session_id} ran out of cards on {action}, discarding it");
            self.registry.remove(session_id);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::game::{Rank, Suit};
    use crate::wallet::{InMemoryBalanceCache, InMemoryBalanceStore};

    fn service(ranks: &'static [Rank]) -> BlackjackService {
        let ledger = LedgerStore::new(
            Arc::new(InMemoryBalanceStore::new()),
            Arc::new(InMemoryBalanceCache::new()),
        );
        BlackjackService::new(
            Arc::new(SessionRegistry::default()),
            Arc::new(ledger),
            PayoutConfig::default(),
        )
        .with_deck_source(move || {
            let cards = ranks
                .iter()
                .enumerate()
                .map(|(i, rank)| Card(*rank, Suit::ALL[i % 4]));
            Deck::stacked(cards).unwrap_or_default()
        })
    }

    #[tokio::test]
    async fn test_new_session_hides_hole_card() {
        let service = service(&[Rank::Ten, Rank::Six, Rank::Seven, Rank::Five, Rank::Nine]);
        let view = service.new_session(1, Deadline::default()).await.unwrap();
        assert_eq!(view.player_cards.len(), 2);
        assert_eq!(view.dealer_up_card.map(|c| c.rank()), Some(Rank::Six));
        assert_eq!(view.player_total, 17);
        assert_eq!(view.balance, 0);
        assert_eq!(service.active_sessions(), 1);
    }

    #[tokio::test]
    async fn test_foreign_account_cannot_act() {
        let service = service(&[Rank::Ten, Rank::Six, Rank::Seven, Rank::Five, Rank::Nine]);
        let view = service.new_session(1, Deadline::default()).await.unwrap();

        let err = service
            .stand(view.session_id, 2, Deadline::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionNotFound);

        // The owner can still play.
        assert!(service.stand(view.session_id, 1, Deadline::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_deck_discards_session() {
        // Exactly four cards: the deal works, the hit cannot.
        let service = service(&[Rank::Two, Rank::Three, Rank::Four, Rank::Five]);
        let view = service.new_session(1, Deadline::default()).await.unwrap();

        let err = service
            .hit(view.session_id, 1, Deadline::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyDeck);
        assert_eq!(service.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_adjust_balance() {
        let service = service(&[]);
        assert_eq!(service.open_account(5, Deadline::default()).await.unwrap(), 1000);
        assert_eq!(
            service.adjust_balance(5, -250, Deadline::default()).await.unwrap(),
            750
        );
        assert_eq!(service.get_balance(5, Deadline::default()).await.unwrap(), 750);
    }
}
