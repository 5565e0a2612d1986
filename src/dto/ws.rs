use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::{
    catalog::PlaylistSummary,
    dto::validation::validate_playlist_id,
    state::{
        game::{Selection, Selections},
        round::Scoreboard,
        state_machine::ParticipantState,
    },
};

/// Messages accepted from participant WebSocket clients, already validated
/// against the state the sender was in.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Display name chosen while awaiting the username.
    Username(String),
    /// Game configuration sent by the leader.
    Setup(GameSetup),
    /// Guess for the active round.
    Answer(Selection),
    /// Leader decision once the game is over.
    ReplayChoice(ReplayChoice),
}

/// Game configuration submitted by the leader.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct GameSetup {
    /// Number of rounds to play, at most three digits like the setup form allows.
    #[serde(rename = "max rounds", alias = "maxRounds")]
    #[validate(range(min = 1, max = 999))]
    pub max_rounds: u32,
    /// Catalog identifier of the playlist to play.
    #[serde(rename = "playlist ID", alias = "playlistId")]
    #[validate(custom(function = "validate_playlist_id"))]
    pub playlist_id: String,
}

/// Decision taken by the leader from the play-again prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayChoice {
    /// Replay with the same playlist and participants.
    PlayAgain,
    /// Discard the game and go back to the username prompt.
    NewGame,
}

/// Reasons an inbound frame is rejected before reaching the session.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No message is expected from a participant in this state.
    #[error("no message is expected while in {0:?}")]
    Unexpected(ParticipantState),
    /// The username frame is blank.
    #[error("username must not be empty")]
    EmptyUsername,
    /// The setup payload could not be parsed or failed validation.
    #[error("invalid game setup: {0}")]
    InvalidSetup(String),
    /// The answer payload is not a `{name, artists}` object.
    #[error("malformed answer")]
    MalformedAnswer(#[source] serde_json::Error),
    /// The play-again prompt received something other than the two literals.
    #[error("unknown replay choice `{0}`")]
    UnknownChoice(String),
}

impl InboundMessage {
    /// Decode a text frame according to the state its sender is in.
    pub fn decode(state: ParticipantState, text: &str) -> Result<Self, DecodeError> {
        match state {
            ParticipantState::AwaitingUsername => {
                let username = text.trim();
                if username.is_empty() {
                    return Err(DecodeError::EmptyUsername);
                }
                Ok(Self::Username(username.to_string()))
            }
            ParticipantState::Configuring => {
                let setup: GameSetup = serde_json::from_str(text)
                    .map_err(|err| DecodeError::InvalidSetup(err.to_string()))?;
                setup
                    .validate()
                    .map_err(|err| DecodeError::InvalidSetup(err.to_string()))?;
                Ok(Self::Setup(GameSetup {
                    playlist_id: setup.playlist_id.trim().to_string(),
                    ..setup
                }))
            }
            ParticipantState::AwaitingAnswer => serde_json::from_str(text)
                .map(Self::Answer)
                .map_err(DecodeError::MalformedAnswer),
            ParticipantState::PlayAgainPrompt => match text {
                "play again" => Ok(Self::ReplayChoice(ReplayChoice::PlayAgain)),
                "new game" => Ok(Self::ReplayChoice(ReplayChoice::NewGame)),
                other => Err(DecodeError::UnknownChoice(other.to_string())),
            },
            other => Err(DecodeError::Unexpected(other)),
        }
    }
}

/// Messages pushed to a participant.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// Bare `state N` transition notice.
    State(ParticipantState),
    /// Playlists the leader can configure the game with.
    Playlists(Vec<PlaylistSummary>),
    /// Answer set of the round that just started.
    Selections(Selections),
    /// Cumulative scores.
    Scoreboard(Scoreboard),
    /// Rejected configuration or terminal failure notice.
    Error(String),
}

#[derive(Serialize)]
struct ErrorNotice<'a> {
    error: &'a str,
}

impl OutboundMessage {
    /// Render the message as the text frame sent over the socket.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        match self {
            OutboundMessage::State(state) => Ok(format!("state {}", state.code())),
            OutboundMessage::Playlists(playlists) => serde_json::to_string(playlists),
            OutboundMessage::Selections(selections) => serde_json::to_string(selections),
            OutboundMessage::Scoreboard(scoreboard) => serde_json::to_string(scoreboard),
            OutboundMessage::Error(message) => serde_json::to_string(&ErrorNotice { error: message }),
        }
    }
}
