//! Session store: process-lifetime map from session id to [`Session`].
//!
//! Each id owns two locks. An async turn lock orders turns on that id and may be held across
//! a model call. The session state sits behind a sync `RwLock` that is only held long enough
//! to copy or append, so snapshot reads never wait on inference. This is the only module
//! that mutates a session; everyone else receives cloned snapshots.

use crate::error::{KavachError, KavachResult};
use crate::intelligence;
use crate::types::{ChannelMeta, ExtractedIntelligence, Message, Sender, Session};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// What to do when a turn arrives while another turn on the same session is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Wait for the in-flight turn, then run against its result.
    #[default]
    Queue,
    /// Fail fast with `SessionConflict`.
    Reject,
}

struct SessionSlot {
    turn: Arc<Mutex<()>>,
    state: RwLock<Session>,
}

impl SessionSlot {
    fn new(session: Session) -> Self {
        Self {
            turn: Arc::new(Mutex::new(())),
            state: RwLock::new(session),
        }
    }

    fn snapshot(&self) -> Session {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn apply(
        &self,
        incoming: Message,
        outgoing: Message,
        delta: &ExtractedIntelligence,
        strategy: &str,
    ) -> KavachResult<Session> {
        let mut session = self.state.write().unwrap_or_else(PoisonError::into_inner);
        apply_turn(&mut session, incoming, outgoing, delta, strategy)?;
        Ok(session.clone())
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<SessionSlot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing slot, or a fresh one. The entry API guarantees one slot per id even when
    /// two first turns race.
    fn slot(&self, session_id: &str, meta: &ChannelMeta) -> Arc<SessionSlot> {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::info!(session = session_id, channel = meta.channel.label(), "session created");
                Arc::new(SessionSlot::new(Session::new(session_id, meta.clone())))
            })
            .value()
            .clone()
    }

    fn existing(&self, session_id: &str) -> Option<Arc<SessionSlot>> {
        self.sessions.get(session_id).map(|e| e.value().clone())
    }

    /// Snapshot of the session, creating it if unseen. Metadata on later calls is ignored.
    pub fn get_or_create(&self, session_id: &str, meta: &ChannelMeta) -> Session {
        self.slot(session_id, meta).snapshot()
    }

    /// Take the turn lock on the session (creating it if unseen). Reads stay available while
    /// the guard is held.
    pub async fn begin_turn(
        &self,
        session_id: &str,
        meta: &ChannelMeta,
        policy: ConflictPolicy,
    ) -> KavachResult<TurnGuard> {
        let slot = self.slot(session_id, meta);
        let turn = match policy {
            ConflictPolicy::Queue => slot.turn.clone().lock_owned().await,
            ConflictPolicy::Reject => slot
                .turn
                .clone()
                .try_lock_owned()
                .map_err(|_| KavachError::SessionConflict(session_id.to_string()))?,
        };
        let snapshot = slot.snapshot();
        Ok(TurnGuard {
            slot,
            snapshot,
            _turn: turn,
        })
    }

    /// Append one completed turn to an existing session, ordered after any turn in flight.
    pub async fn append_turn(
        &self,
        session_id: &str,
        incoming: Message,
        outgoing: Message,
        delta: &ExtractedIntelligence,
        strategy: &str,
    ) -> KavachResult<Session> {
        let slot = self
            .existing(session_id)
            .ok_or_else(|| KavachError::UnknownSession(session_id.to_string()))?;
        let _turn = slot.turn.lock().await;
        slot.apply(incoming, outgoing, delta, strategy)
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.existing(session_id).map(|slot| slot.snapshot())
    }

    /// Drop the session. An in-flight turn still commits to its own copy of the slot.
    pub fn end(&self, session_id: &str) -> Option<Session> {
        let (_, slot) = self.sessions.remove(session_id)?;
        tracing::info!(session = session_id, "session ended");
        Some(slot.snapshot())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

/// Exclusive right to run one turn on a session.
pub struct TurnGuard {
    slot: Arc<SessionSlot>,
    snapshot: Session,
    _turn: OwnedMutexGuard<()>,
}

impl TurnGuard {
    /// The session as it stood when the turn began. No other turn can change it meanwhile.
    pub fn session(&self) -> &Session {
        &self.snapshot
    }

    /// Apply the turn and release the turn lock.
    pub fn commit(
        self,
        incoming: Message,
        outgoing: Message,
        delta: &ExtractedIntelligence,
        strategy: &str,
    ) -> KavachResult<Session> {
        self.slot.apply(incoming, outgoing, delta, strategy)
    }
}

/// All checks run before the first write, so a rejected turn leaves the session untouched.
fn apply_turn(
    session: &mut Session,
    incoming: Message,
    outgoing: Message,
    delta: &ExtractedIntelligence,
    strategy: &str,
) -> KavachResult<()> {
    if incoming.sender != Sender::Adversary {
        return Err(KavachError::InvalidRequest(
            "incoming message must come from the adversary".to_string(),
        ));
    }
    if outgoing.sender != Sender::Agent {
        return Err(KavachError::InvalidRequest(
            "outgoing message must come from the agent".to_string(),
        ));
    }

    session.history.push(incoming);
    session.history.push(outgoing);
    let added = intelligence::union_into(&mut session.intelligence, delta);
    session.strategies.push(strategy.to_string());

    tracing::info!(
        session = %session.id,
        turn = session.turns(),
        new_indicators = added,
        total_indicators = session.intelligence.total(),
        "turn committed"
    );
    Ok(())
}
