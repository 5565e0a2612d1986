use serde::Serialize;

use crate::state::{
    registry::ParticipantId,
    round::{RoundStage, Scoreboard},
    state_machine::ParticipantState,
};

/// Read-only view of the game session returned by `GET /session`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Game-level stage.
    pub stage: RoundStage,
    /// Active round number, 0 when no round was played yet.
    pub round: u32,
    /// Configured number of rounds, 0 when idle.
    pub max_rounds: u32,
    /// Playlist the game is played with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    /// Connected participants in id order.
    pub participants: Vec<ParticipantSnapshot>,
    /// Cumulative scores of the current game cycle.
    pub scoreboard: Scoreboard,
}

/// Public fields of one connected participant.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantSnapshot {
    /// Registry-assigned id.
    pub id: ParticipantId,
    /// Chosen display name, if any.
    pub username: Option<String>,
    /// Whether the participant holds leadership.
    pub is_leader: bool,
    /// Current state.
    pub state: ParticipantState,
    /// Same number as the `state N` notices.
    pub state_code: u8,
    /// Whether a guess is recorded for the active round.
    pub answered: bool,
}
