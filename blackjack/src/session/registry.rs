//! Registry of live rounds keyed by session id.

use dashmap::DashMap;
use log::{debug, info};
use std::{sync::Arc, time::Instant};
use tokio::{sync::Mutex, task::JoinHandle};

use super::config::SessionConfig;
use crate::db::{Deadline, DeadlineExceeded};
use crate::game::{Deck, GameError, GameSession, SessionId};
use crate::wallet::AccountId;

type SessionEntry = Arc<Mutex<GameSession>>;

/// Session registry
///
/// Rounds live in a sharded map, each behind its own async mutex. Requests
/// for one id queue on that mutex in arrival order; requests for different
/// ids only meet on a shard lock, which is never held across an await.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionEntry>,
    config: SessionConfig,
}

impl SessionRegistry {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Deal a round for `account_id` from `deck` and register it
    pub fn create(&self, account_id: AccountId, deck: Deck) -> Result<SessionId, GameError> {
        let session = GameSession::deal(account_id, deck)?;
        Ok(self.insert(session))
    }

    /// Register an already dealt round
    pub fn insert(&self, session: GameSession) -> SessionId {
        let id = session.id();
        debug!("registering session {id} for account {}", session.account_id());
        self.sessions.insert(id, Arc::new(Mutex::new(session)));
        id
    }

    /// Run `f` with exclusive access to one round
    ///
    /// Waits behind earlier requests for the same id. The lock is released
    /// when `f` returns, whatever it returns.
    ///
    /// # Errors
    ///
    /// * `GameError::SessionNotFound` - Unknown or evicted id
    /// * Whatever `f` fails with
    pub async fn with_session<T, F>(&self, id: SessionId, f: F) -> Result<T, GameError>
    where
        F: FnOnce(&mut GameSession) -> Result<T, GameError>,
    {
        let entry = self.entry(id)?;
        let mut session = entry.lock().await;
        f(&mut *session)
    }

    /// Like [`with_session`](Self::with_session), but gives up once
    /// `deadline` passes.
    ///
    /// The deadline bounds the wait for the lock and is checked again once
    /// the lock is held, so `f` never runs for a request that has already
    /// timed out and the round is left untouched.
    pub async fn with_session_until<T, E, F>(
        &self,
        id: SessionId,
        deadline: Deadline,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut GameSession) -> Result<T, E>,
        E: From<GameError> + From<DeadlineExceeded>,
    {
        let entry = self.entry(id)?;
        let mut session = deadline.run(entry.lock()).await?;
        if deadline.is_expired() {
            debug!("deadline passed while queued on session {id}");
            return Err(DeadlineExceeded(deadline.budget()).into());
        }
        f(&mut *session)
    }

    // Clone the entry out so the shard guard is gone before anyone awaits.
    fn entry(&self, id: SessionId) -> Result<SessionEntry, GameError> {
        self.sessions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(GameError::SessionNotFound(id))
    }

    /// Drop a round. Returns whether it was registered.
    pub fn remove(&self, id: SessionId) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Evict every round that is idle past `idle_ttl` or finished past
    /// `finished_retention`, as seen at `now`. Returns how many went.
    ///
    /// An entry a request currently holds (or is waiting on) is skipped and
    /// reconsidered on the next sweep.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut evicted = 0;
        self.sessions.retain(|id, entry| {
            if Arc::strong_count(entry) > 1 {
                return true;
            }
            let Ok(session) = entry.try_lock() else {
                return true;
            };
            if self.is_stale(&session, now) {
                debug!("evicting session {id} ({})", session.state());
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }

    fn is_stale(&self, session: &GameSession, now: Instant) -> bool {
        let finished_expired = session.finished_at().is_some_and(|finished_at| {
            now.saturating_duration_since(finished_at) >= self.config.finished_retention
        });
        let idle_expired =
            now.saturating_duration_since(session.last_touched()) >= self.config.idle_ttl;
        finished_expired || idle_expired
    }

    /// Run [`SessionRegistry::sweep`] every `sweep_interval` until the task is
    /// aborted. `on_sweep` receives the number of rounds evicted by each pass.
    pub fn spawn_sweeper<F>(self: Arc<Self>, mut on_sweep: F) -> JoinHandle<()>
    where
        F: FnMut(usize) + Send + 'static,
    {
        let period = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let evicted = self.sweep(Instant::now());
                if evicted > 0 {
                    info!("evicted {evicted} sessions, {} remain", self.len());
                }
                on_sweep(evicted);
            }
        })
    }
}
