//! Leader election and failover.
//!
//! Exactly one participant holds leadership while the registry is non-empty.
//! The rule is deterministic: the first participant of an empty registry leads
//! (see [`ConnectionRegistry::register`]) and when the leader leaves, the
//! participant with the smallest remaining id takes over.

use crate::state::{
    registry::{ConnectionRegistry, ParticipantId},
    state_machine::ParticipantState,
};

/// Outcome of reconciling leadership after a departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Succession {
    /// The departed participant was not the leader.
    Unchanged,
    /// Nobody is left to lead.
    Vacant,
    /// Leadership moved to another participant.
    Elected {
        /// New leader.
        id: ParticipantId,
        /// State the new leader was in when elected.
        previous_state: ParticipantState,
    },
}

/// Hand leadership over if the departed participant held it.
///
/// Must run after the departed participant was unregistered.
pub fn elect_successor(registry: &mut ConnectionRegistry, departed_was_leader: bool) -> Succession {
    if registry.is_empty() {
        return Succession::Vacant;
    }
    if !departed_was_leader || registry.leader().is_some() {
        return Succession::Unchanged;
    }

    let Some(id) = registry.smallest_id() else {
        return Succession::Vacant;
    };
    match registry.get_mut(id) {
        Ok(successor) => {
            successor.is_leader = true;
            Succession::Elected {
                id,
                previous_state: successor.state,
            }
        }
        Err(_) => Succession::Vacant,
    }
}
