//! Registry of live participant connections.

use std::{collections::BTreeMap, time::Duration};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

use crate::{
    dto::ws::OutboundMessage,
    state::{
        game::Selection,
        state_machine::{InvalidTransition, ParticipantEvent, ParticipantState},
    },
};

/// Identifier of a participant, unique for the lifetime of its connection.
pub type ParticipantId = u64;

/// Channel feeding a participant's socket writer.
pub type Outbox = mpsc::UnboundedSender<OutboundMessage>;

/// Lookup failure for an id that is not (or no longer) registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("participant `{0}` is not connected")]
pub struct UnknownParticipant(pub ParticipantId);

/// One live connection and its per-participant game fields.
#[derive(Debug)]
pub struct Participant {
    /// Connection identifier.
    pub id: ParticipantId,
    /// Username for the current game cycle, unset until the first message.
    pub username: Option<String>,
    /// Whether this participant configures and restarts games.
    pub is_leader: bool,
    /// Node of the participant's state machine.
    pub state: ParticipantState,
    /// Guess submitted for the active round.
    pub pending_answer: Option<Selection>,
    /// Time between the round start and the guess.
    pub answer_latency: Option<Duration>,
    outbox: Outbox,
}

impl Participant {
    /// Push a message to the participant's socket.
    ///
    /// A closed channel only means the socket is going away; the disconnect
    /// path will unregister the participant.
    pub fn send(&self, message: OutboundMessage) {
        if self.outbox.send(message).is_err() {
            warn!(participant = self.id, "outbound channel closed, dropping message");
        }
    }

    /// Move the participant along its state machine.
    pub fn apply(&mut self, event: ParticipantEvent) -> Result<ParticipantState, InvalidTransition> {
        self.state = self.state.on(event)?;
        Ok(self.state)
    }

    /// Forget the guess of the previous round.
    pub fn clear_answer(&mut self) {
        self.pending_answer = None;
        self.answer_latency = None;
    }

    /// Username or an empty string when none was given yet.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }
}

/// Every participant currently connected, keyed by id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    participants: BTreeMap<ParticipantId, Participant>,
    next_id: ParticipantId,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection, returning its id.
    ///
    /// The first participant of an empty registry becomes leader.
    pub fn register(&mut self, outbox: Outbox) -> ParticipantId {
        let id = self.next_id;
        self.next_id += 1;
        let is_leader = self.participants.is_empty();
        self.participants.insert(
            id,
            Participant {
                id,
                username: None,
                is_leader,
                state: ParticipantState::AwaitingUsername,
                pending_answer: None,
                answer_latency: None,
                outbox,
            },
        );
        id
    }

    /// Remove a connection. The id counter restarts at zero once nobody is left.
    pub fn unregister(&mut self, id: ParticipantId) -> Option<Participant> {
        let removed = self.participants.remove(&id);
        if self.participants.is_empty() {
            self.next_id = 0;
        }
        removed
    }

    /// Look up a participant.
    pub fn get(&self, id: ParticipantId) -> Result<&Participant, UnknownParticipant> {
        self.participants.get(&id).ok_or(UnknownParticipant(id))
    }

    /// Look up a participant for mutation.
    pub fn get_mut(&mut self, id: ParticipantId) -> Result<&mut Participant, UnknownParticipant> {
        self.participants.get_mut(&id).ok_or(UnknownParticipant(id))
    }

    /// Apply `action` to every participant matching `predicate`, in id order.
    ///
    /// The set of visited ids is fixed before the first action runs.
    pub fn for_each<P, A>(&mut self, mut predicate: P, mut action: A)
    where
        P: FnMut(&Participant) -> bool,
        A: FnMut(&mut Participant),
    {
        let ids: Vec<ParticipantId> = self
            .participants
            .values()
            .filter(|participant| predicate(participant))
            .map(|participant| participant.id)
            .collect();
        for id in ids {
            if let Some(participant) = self.participants.get_mut(&id) {
                action(participant);
            }
        }
    }

    /// Ids of the participants matching `predicate`, in id order.
    pub fn ids_where<P>(&self, mut predicate: P) -> Vec<ParticipantId>
    where
        P: FnMut(&Participant) -> bool,
    {
        self.participants
            .values()
            .filter(|participant| predicate(participant))
            .map(|participant| participant.id)
            .collect()
    }

    /// Iterate over the participants in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Id of the current leader.
    pub fn leader(&self) -> Option<ParticipantId> {
        self.participants
            .values()
            .find(|participant| participant.is_leader)
            .map(|participant| participant.id)
    }

    /// Smallest id still connected.
    pub fn smallest_id(&self) -> Option<ParticipantId> {
        self.participants.keys().copied().min()
    }

    /// Number of connected participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
