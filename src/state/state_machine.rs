//! Per-participant state machine and the codes of its `state N` notices.

use serde::Serialize;
use thiserror::Error;

/// Phases a single participant moves through during a game cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantState {
    /// Connected, the next message is expected to be the username.
    AwaitingUsername,
    /// Username known, waiting for the leader to start the game.
    Ready,
    /// Leader only: choosing the playlist and number of rounds.
    Configuring,
    /// Selections are displayed, a guess is expected.
    AwaitingAnswer,
    /// Guess submitted, waiting for the rest of the room.
    WaitingForOthers,
    /// Round scored, scoreboard is displayed.
    ScoreboardDisplay,
    /// Last round scored, final ranking is displayed.
    GameOver,
    /// Leader only: deciding between a replay and a brand new game.
    PlayAgainPrompt,
}

impl ParticipantState {
    /// Numeric code used by `state N` notices on the wire.
    pub fn code(self) -> u8 {
        match self {
            ParticipantState::AwaitingUsername => 1,
            ParticipantState::Ready => 2,
            ParticipantState::Configuring => 3,
            ParticipantState::AwaitingAnswer => 4,
            ParticipantState::WaitingForOthers => 5,
            ParticipantState::ScoreboardDisplay => 6,
            ParticipantState::GameOver => 7,
            ParticipantState::PlayAgainPrompt => 8,
        }
    }

    /// Whether a participant in this state joins a game that is being started.
    pub fn joins_new_game(self) -> bool {
        matches!(
            self,
            ParticipantState::Ready
                | ParticipantState::Configuring
                | ParticipantState::GameOver
                | ParticipantState::PlayAgainPrompt
        )
    }

    /// Whether the participant belongs to a finished game awaiting the leader's decision.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            ParticipantState::GameOver | ParticipantState::PlayAgainPrompt
        )
    }

    /// Apply an event, returning the next state or the rejected pair.
    pub fn on(self, event: ParticipantEvent) -> Result<ParticipantState, InvalidTransition> {
        use ParticipantEvent as E;
        use ParticipantState as S;

        let next = match (self, event) {
            (S::AwaitingUsername, E::UsernameAccepted { leader: true }) => S::Configuring,
            (S::AwaitingUsername, E::UsernameAccepted { leader: false }) => S::Ready,
            (S::Ready, E::Promoted) => S::Configuring,
            (from, E::GameStarted) if from.joins_new_game() => S::AwaitingAnswer,
            (S::AwaitingAnswer, E::AnswerSubmitted) => S::WaitingForOthers,
            (S::WaitingForOthers, E::BarrierClosed) => S::ScoreboardDisplay,
            (S::ScoreboardDisplay, E::NextRound) => S::AwaitingAnswer,
            (S::ScoreboardDisplay, E::GameFinished) => S::GameOver,
            (S::GameOver, E::ReplayPrompted) => S::PlayAgainPrompt,
            (from, E::Replay) if from.is_finished() => S::AwaitingAnswer,
            (from, E::NewGame) if from.is_finished() => S::AwaitingUsername,
            (_, E::CycleAborted) => S::AwaitingUsername,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

/// Events driving a participant's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantEvent {
    /// The username was accepted; leaders go on to configure the game.
    UsernameAccepted {
        /// Whether the participant holds leadership at that moment.
        leader: bool,
    },
    /// Leadership was handed over to a participant that had not configured anything yet.
    Promoted,
    /// The leader configured a game and the first round is committed.
    GameStarted,
    /// A guess was recorded for the active round.
    AnswerSubmitted,
    /// Every participant of the round has answered (or left).
    BarrierClosed,
    /// The scoreboard delay elapsed and another round is committed.
    NextRound,
    /// The scoreboard delay elapsed after the last round.
    GameFinished,
    /// The leader is asked whether to replay.
    ReplayPrompted,
    /// The leader chose to replay with the same playlist.
    Replay,
    /// The leader chose to start from scratch.
    NewGame,
    /// The game cycle was aborted because of an upstream failure.
    CycleAborted,
}

/// Error returned when an event is not valid from the participant's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The state the participant was in when the event was received.
    pub from: ParticipantState,
    /// The event that cannot be applied from this state.
    pub event: ParticipantEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(state: ParticipantState, event: ParticipantEvent) -> ParticipantState {
        state.on(event).unwrap()
    }

    #[test]
    fn codes_match_wire_numbers() {
        let codes: Vec<u8> = [
            ParticipantState::AwaitingUsername,
            ParticipantState::Ready,
            ParticipantState::Configuring,
            ParticipantState::AwaitingAnswer,
            ParticipantState::WaitingForOthers,
            ParticipantState::ScoreboardDisplay,
            ParticipantState::GameOver,
            ParticipantState::PlayAgainPrompt,
        ]
        .into_iter()
        .map(ParticipantState::code)
        .collect();
        assert_eq!(codes, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn leader_happy_path_through_game() {
        let mut state = ParticipantState::AwaitingUsername;

        state = apply(state, ParticipantEvent::UsernameAccepted { leader: true });
        assert_eq!(state, ParticipantState::Configuring);
        state = apply(state, ParticipantEvent::GameStarted);
        assert_eq!(state, ParticipantState::AwaitingAnswer);
        state = apply(state, ParticipantEvent::AnswerSubmitted);
        assert_eq!(state, ParticipantState::WaitingForOthers);
        state = apply(state, ParticipantEvent::BarrierClosed);
        assert_eq!(state, ParticipantState::ScoreboardDisplay);
        state = apply(state, ParticipantEvent::NextRound);
        assert_eq!(state, ParticipantState::AwaitingAnswer);
        state = apply(state, ParticipantEvent::AnswerSubmitted);
        state = apply(state, ParticipantEvent::BarrierClosed);
        state = apply(state, ParticipantEvent::GameFinished);
        assert_eq!(state, ParticipantState::GameOver);
        state = apply(state, ParticipantEvent::ReplayPrompted);
        assert_eq!(state, ParticipantState::PlayAgainPrompt);
        state = apply(state, ParticipantEvent::NewGame);
        assert_eq!(state, ParticipantState::AwaitingUsername);
    }

    #[test]
    fn non_leader_waits_in_ready() {
        let state = apply(
            ParticipantState::AwaitingUsername,
            ParticipantEvent::UsernameAccepted { leader: false },
        );
        assert_eq!(state, ParticipantState::Ready);
        assert_eq!(
            apply(state, ParticipantEvent::Promoted),
            ParticipantState::Configuring
        );
    }

    #[test]
    fn replay_is_accepted_from_finished_states_only() {
        assert_eq!(
            apply(ParticipantState::GameOver, ParticipantEvent::Replay),
            ParticipantState::AwaitingAnswer
        );
        assert_eq!(
            apply(ParticipantState::PlayAgainPrompt, ParticipantEvent::Replay),
            ParticipantState::AwaitingAnswer
        );
        assert!(
            ParticipantState::ScoreboardDisplay
                .on(ParticipantEvent::Replay)
                .is_err()
        );
    }

    #[test]
    fn second_answer_in_same_round_is_rejected() {
        let err = ParticipantState::WaitingForOthers
            .on(ParticipantEvent::AnswerSubmitted)
            .unwrap_err();
        assert_eq!(err.from, ParticipantState::WaitingForOthers);
        assert_eq!(err.event, ParticipantEvent::AnswerSubmitted);
    }

    #[test]
    fn promotion_only_applies_to_ready_participants() {
        assert!(
            ParticipantState::AwaitingAnswer
                .on(ParticipantEvent::Promoted)
                .is_err()
        );
    }

    #[test]
    fn abort_returns_any_state_to_username_prompt() {
        for state in [
            ParticipantState::Ready,
            ParticipantState::AwaitingAnswer,
            ParticipantState::ScoreboardDisplay,
            ParticipantState::PlayAgainPrompt,
        ] {
            assert_eq!(
                apply(state, ParticipantEvent::CycleAborted),
                ParticipantState::AwaitingUsername
            );
        }
    }
}
