//! The single game session: connection registry plus round coordinator,
//! mutated as one unit under the session lock.
//!
//! Every method here is synchronous. Catalog calls happen in the service
//! layer with the lock released; the work they feed back is committed through
//! the methods taking a [`Generation`], which drop stale results.

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    catalog::PlaylistSummary,
    dto::{
        session::{ParticipantSnapshot, SessionSnapshot},
        ws::OutboundMessage,
    },
    error::ServiceError,
    state::{
        game::{Playlist, Selection, Selections},
        leader::{Succession, elect_successor},
        registry::{ConnectionRegistry, Outbox, Participant, ParticipantId, UnknownParticipant},
        round::{Generation, RoundCoordinator, RoundStage},
        state_machine::{ParticipantEvent, ParticipantState},
    },
};

/// Claim on a game configuration in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupTicket {
    /// Token the prepared round must be committed with.
    pub generation: Generation,
    resume: RoundStage,
}

/// What happens once the scoreboard delay has elapsed.
#[derive(Debug, Clone)]
pub enum Conclusion {
    /// Another round must be prepared from `playlist`.
    NextRound {
        /// Token the next round must be committed with.
        generation: Generation,
        /// Playlist of the running game.
        playlist: Playlist,
    },
    /// The game is over; the leader is asked about a replay after a delay.
    Finished(Generation),
}

/// Follow-up work after a participant disconnected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Departure {
    /// The departure closed the answer barrier; the scoreboard delay starts with this token.
    pub scoreboard_timer: Option<Generation>,
    /// Newly elected leader that must be sent the playlists.
    pub promoted: Option<ParticipantId>,
}

/// Registry and round state of the one game room.
#[derive(Debug, Default)]
pub struct GameSession {
    registry: ConnectionRegistry,
    rounds: RoundCoordinator,
}

impl GameSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connected participants.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Round state.
    pub fn rounds(&self) -> &RoundCoordinator {
        &self.rounds
    }

    /// Register a new connection.
    pub fn join(&mut self, outbox: Outbox) -> ParticipantId {
        let id = self.registry.register(outbox);
        info!(
            participant = id,
            leader = self.registry.leader() == Some(id),
            connected = self.registry.len(),
            "participant joined"
        );
        id
    }

    /// State a participant's next message is decoded against.
    pub fn state_of(&self, id: ParticipantId) -> Result<ParticipantState, UnknownParticipant> {
        self.registry.get(id).map(|participant| participant.state)
    }

    /// Push a message to a single participant.
    pub fn notify(&self, id: ParticipantId, message: OutboundMessage) {
        match self.registry.get(id) {
            Ok(participant) => participant.send(message),
            Err(err) => debug!(error = %err, "dropping message for departed participant"),
        }
    }

    /// Record the username. Leaders move on to configuring (the caller then
    /// fetches the playlists), everybody else waits in `Ready`.
    pub fn accept_username(
        &mut self,
        id: ParticipantId,
        username: String,
    ) -> Result<ParticipantState, ServiceError> {
        let participant = self.registry.get_mut(id)?;
        let leader = participant.is_leader;
        let next = participant.apply(ParticipantEvent::UsernameAccepted { leader })?;
        info!(participant = id, %username, leader, "username accepted");
        participant.username = Some(username);
        if next == ParticipantState::Ready {
            participant.send(OutboundMessage::State(next));
        }
        Ok(next)
    }

    /// Hand the playlists to a leader that is still configuring.
    pub fn deliver_playlists(
        &self,
        id: ParticipantId,
        playlists: Vec<PlaylistSummary>,
    ) -> bool {
        let Ok(participant) = self.registry.get(id) else {
            debug!(participant = id, "leader left before playlists arrived");
            return false;
        };
        if !participant.is_leader || participant.state != ParticipantState::Configuring {
            debug!(participant = id, state = ?participant.state, "playlists no longer expected");
            return false;
        }
        participant.send(OutboundMessage::Playlists(playlists));
        participant.send(OutboundMessage::State(ParticipantState::Configuring));
        true
    }

    /// Reserve the round lifecycle for a game configured by `id`.
    pub fn begin_setup(&mut self, id: ParticipantId) -> Result<SetupTicket, ServiceError> {
        let participant = self.registry.get(id)?;
        if !participant.is_leader {
            return Err(ServiceError::ProtocolViolation(
                "only the leader can configure a game".into(),
            ));
        }
        if !self.rounds.accepts_setup() {
            return Err(ServiceError::ProtocolViolation(format!(
                "cannot configure a game while {:?}",
                self.rounds.stage()
            )));
        }
        let resume = self.rounds.stage();
        let generation = self.rounds.claim(RoundStage::Preparing);
        debug!(participant = id, %generation, "game setup started");
        Ok(SetupTicket { generation, resume })
    }

    /// Give the stage back after a rejected configuration; nothing was committed.
    pub fn cancel_setup(&mut self, ticket: SetupTicket) {
        if self.rounds.is_current(ticket.generation) {
            self.rounds.set_stage(ticket.resume);
        }
    }

    /// Commit the first round of a freshly configured game.
    ///
    /// Everyone in `Ready`, `Configuring`, `GameOver` or `PlayAgainPrompt`
    /// plays. Returns `false` when the result is stale or nobody is left.
    pub fn start_game(
        &mut self,
        generation: Generation,
        playlist: Playlist,
        max_rounds: u32,
        selections: Selections,
        now: Instant,
    ) -> bool {
        if !self.rounds.is_current(generation) {
            debug!(%generation, "dropping stale game setup");
            return false;
        }
        let players = self
            .registry
            .ids_where(|participant| participant.state.joins_new_game());
        if players.is_empty() {
            self.end_quietly();
            return false;
        }

        self.rounds.configure(playlist, max_rounds);
        for participant in self.registry.iter().filter(|p| players.contains(&p.id)) {
            self.rounds
                .scoreboard_mut()
                .enroll(participant.id, participant.display_name());
        }
        self.commit(generation, 1, selections, now, &players, ParticipantEvent::GameStarted);
        info!(%generation, max_rounds, players = players.len(), "game started");
        true
    }

    /// Record a guess for the active round.
    ///
    /// Returns the token of the barrier when this answer closed it.
    pub fn submit_answer(
        &mut self,
        id: ParticipantId,
        answer: Selection,
        now: Instant,
    ) -> Result<Option<Generation>, ServiceError> {
        let latency = self.rounds.latency(now).unwrap_or_default();
        let participant = self.registry.get_mut(id)?;
        let next = participant.apply(ParticipantEvent::AnswerSubmitted)?;
        participant.pending_answer = Some(answer);
        participant.answer_latency = Some(latency);
        participant.send(OutboundMessage::State(next));
        let closed = self.rounds.resolve(id);
        debug!(
            participant = id,
            latency_ms = latency.as_millis() as u64,
            outstanding = self.rounds.barrier().outstanding(),
            "answer recorded"
        );
        Ok(closed)
    }

    /// Score the round whose barrier closed and show the scoreboard.
    ///
    /// Returns the token the scoreboard delay must present, or `None` when
    /// `generation` was superseded.
    pub fn close_round(&mut self, generation: Generation) -> Option<Generation> {
        if !self.rounds.is_current(generation) {
            debug!(%generation, "barrier closed for a stale round");
            return None;
        }

        for participant in self.registry.iter() {
            if participant.state != ParticipantState::WaitingForOthers {
                continue;
            }
            if let (Some(answer), Some(latency)) =
                (&participant.pending_answer, participant.answer_latency)
            {
                let points = self.rounds.score_answer(participant.id, answer, latency);
                debug!(participant = participant.id, points, "answer scored");
            }
        }

        let scoreboard = self.rounds.scoreboard().clone();
        self.registry.for_each(
            |participant| participant.state == ParticipantState::WaitingForOthers,
            |participant| {
                if transition(participant, ParticipantEvent::BarrierClosed) {
                    participant.send(OutboundMessage::Scoreboard(scoreboard.clone()));
                }
            },
        );

        let next = self.rounds.claim(RoundStage::Scoreboard);
        info!(round = self.rounds.round_number(), %next, "round scored");
        Some(next)
    }

    /// Leave the scoreboard once its delay elapsed.
    pub fn conclude_scoreboard(&mut self, generation: Generation) -> Option<Conclusion> {
        if !self.rounds.is_current(generation) {
            return None;
        }
        let viewers = self
            .registry
            .ids_where(|participant| participant.state == ParticipantState::ScoreboardDisplay);
        if viewers.is_empty() {
            self.end_quietly();
            return None;
        }

        if !self.rounds.is_last_round() {
            let playlist = self.rounds.playlist().cloned()?;
            let generation = self.rounds.claim(RoundStage::Preparing);
            return Some(Conclusion::NextRound {
                generation,
                playlist,
            });
        }

        let ranking = self.rounds.scoreboard().ranked();
        self.registry.for_each(
            |participant| participant.state == ParticipantState::ScoreboardDisplay,
            |participant| {
                if transition(participant, ParticipantEvent::GameFinished) {
                    participant.send(OutboundMessage::Scoreboard(ranking.clone()));
                    participant.send(OutboundMessage::State(ParticipantState::GameOver));
                }
            },
        );
        let generation = self.rounds.claim(RoundStage::Finished);
        info!(rounds = self.rounds.round_number(), "game over");
        Some(Conclusion::Finished(generation))
    }

    /// Commit the next round for everyone still looking at the scoreboard.
    pub fn advance_round(
        &mut self,
        generation: Generation,
        selections: Selections,
        now: Instant,
    ) -> bool {
        if !self.rounds.is_current(generation) {
            debug!(%generation, "dropping stale round advance");
            return false;
        }
        let players = self
            .registry
            .ids_where(|participant| participant.state == ParticipantState::ScoreboardDisplay);
        if players.is_empty() {
            self.end_quietly();
            return false;
        }
        let number = self.rounds.round_number() + 1;
        self.commit(generation, number, selections, now, &players, ParticipantEvent::NextRound);
        info!(round = number, max_rounds = self.rounds.max_rounds(), "round started");
        true
    }

    /// Ask the leader whether to replay, once the prompt delay elapsed.
    pub fn prompt_replay(&mut self, generation: Generation) {
        if !self.rounds.is_current(generation) {
            return;
        }
        self.rounds.mark_replay_prompted();
        let Some(leader) = self.registry.leader() else {
            return;
        };
        if let Ok(participant) = self.registry.get_mut(leader) {
            if participant.state == ParticipantState::GameOver
                && transition(participant, ParticipantEvent::ReplayPrompted)
            {
                participant.send(OutboundMessage::State(ParticipantState::PlayAgainPrompt));
            }
        }
    }

    /// Reserve the round lifecycle for a replay requested by `id`.
    pub fn begin_replay(&mut self, id: ParticipantId) -> Result<(Generation, Playlist), ServiceError> {
        self.ensure_finished_game(id)?;
        let playlist = self.rounds.playlist().cloned().ok_or_else(|| {
            ServiceError::ProtocolViolation("the finished game has no playlist".into())
        })?;
        Ok((self.rounds.claim(RoundStage::Preparing), playlist))
    }

    /// Restart the finished game from round one with zeroed scores.
    pub fn restart_game(&mut self, generation: Generation, selections: Selections, now: Instant) -> bool {
        if !self.rounds.is_current(generation) {
            debug!(%generation, "dropping stale replay");
            return false;
        }
        let players = self
            .registry
            .ids_where(|participant| participant.state.is_finished());
        if players.is_empty() {
            self.end_quietly();
            return false;
        }

        self.rounds.restart();
        for participant in self.registry.iter().filter(|p| players.contains(&p.id)) {
            self.rounds
                .scoreboard_mut()
                .enroll(participant.id, participant.display_name());
        }
        self.commit(generation, 1, selections, now, &players, ParticipantEvent::Replay);
        info!(%generation, players = players.len(), "game replayed");
        true
    }

    /// Throw the finished game away and send its participants back to the username prompt.
    pub fn discard_game(&mut self, id: ParticipantId) -> Result<(), ServiceError> {
        self.ensure_finished_game(id)?;
        self.rounds.reset();
        self.registry.for_each(
            |participant| participant.state.is_finished(),
            |participant| {
                if transition(participant, ParticipantEvent::NewGame) {
                    participant.username = None;
                    participant.clear_answer();
                    participant.send(OutboundMessage::State(ParticipantState::AwaitingUsername));
                }
            },
        );
        info!(participant = id, "game discarded, starting over");
        Ok(())
    }

    /// Reconcile the barrier and leadership after a disconnect.
    pub fn leave(&mut self, id: ParticipantId) -> Departure {
        let mut departure = Departure::default();
        let Some(departed) = self.registry.unregister(id) else {
            return departure;
        };
        info!(
            participant = id,
            state = ?departed.state,
            connected = self.registry.len(),
            "participant left"
        );

        if self.registry.is_empty() {
            self.rounds.reset();
            return departure;
        }

        if let Some(generation) = self.rounds.resolve(id) {
            departure.scoreboard_timer = self.close_round(generation);
        }

        if let Succession::Elected { id: successor, previous_state } =
            elect_successor(&mut self.registry, departed.is_leader)
        {
            info!(participant = successor, state = ?previous_state, "leadership handed over");
            let replay_prompted = self.rounds.replay_prompted();
            if let Ok(leader) = self.registry.get_mut(successor) {
                match previous_state {
                    ParticipantState::Ready => {
                        if transition(leader, ParticipantEvent::Promoted) {
                            departure.promoted = Some(successor);
                        }
                    }
                    ParticipantState::GameOver if replay_prompted => {
                        if transition(leader, ParticipantEvent::ReplayPrompted) {
                            leader.send(OutboundMessage::State(ParticipantState::PlayAgainPrompt));
                        }
                    }
                    _ => {}
                }
            }
        }
        departure
    }

    /// Terminate the game cycle after an unrecoverable catalog failure.
    ///
    /// With a token, the abort only applies while that token is current.
    /// Everyone gets the error notice and goes back to the username prompt;
    /// leadership is kept.
    pub fn abort_cycle(&mut self, generation: Option<Generation>, reason: &str) -> bool {
        if let Some(generation) = generation {
            if !self.rounds.is_current(generation) {
                debug!(%generation, "ignoring failure of a superseded step");
                return false;
            }
        }
        warn!(reason, "aborting game cycle");
        self.rounds.reset();
        let notice = OutboundMessage::Error(reason.to_string());
        self.registry.for_each(
            |_| true,
            |participant| {
                participant.send(notice.clone());
                if transition(participant, ParticipantEvent::CycleAborted) {
                    participant.username = None;
                    participant.clear_answer();
                    participant.send(OutboundMessage::State(ParticipantState::AwaitingUsername));
                }
            },
        );
        true
    }

    /// Diagnostic view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            stage: self.rounds.stage(),
            round: self.rounds.round_number(),
            max_rounds: self.rounds.max_rounds(),
            playlist_id: self.rounds.playlist().map(|playlist| playlist.id.clone()),
            participants: self
                .registry
                .iter()
                .map(|participant| ParticipantSnapshot {
                    id: participant.id,
                    username: participant.username.clone(),
                    is_leader: participant.is_leader,
                    state: participant.state,
                    state_code: participant.state.code(),
                    answered: participant.pending_answer.is_some(),
                })
                .collect(),
            scoreboard: self.rounds.scoreboard().clone(),
        }
    }

    fn ensure_finished_game(&self, id: ParticipantId) -> Result<(), ServiceError> {
        if !self.registry.get(id)?.is_leader {
            return Err(ServiceError::ProtocolViolation(
                "only the leader decides about a replay".into(),
            ));
        }
        if self.rounds.stage() != RoundStage::Finished {
            return Err(ServiceError::ProtocolViolation(format!(
                "no finished game to decide about while {:?}",
                self.rounds.stage()
            )));
        }
        Ok(())
    }

    /// Install a round and move `players` into answering it.
    fn commit(
        &mut self,
        generation: Generation,
        number: u32,
        selections: Selections,
        now: Instant,
        players: &[ParticipantId],
        event: ParticipantEvent,
    ) {
        self.rounds
            .commit_round(generation, number, selections.clone(), now, players.iter().copied());
        self.registry.for_each(
            |participant| players.contains(&participant.id),
            |participant| {
                participant.clear_answer();
                if transition(participant, event) {
                    participant.send(OutboundMessage::Selections(selections.clone()));
                }
            },
        );
    }

    fn end_quietly(&mut self) {
        info!("nobody left to play, game cycle ended");
        self.rounds.reset();
    }
}

/// Apply an event that the caller already filtered for; a refusal is only logged.
fn transition(participant: &mut Participant, event: ParticipantEvent) -> bool {
    match participant.apply(event) {
        Ok(_) => true,
        Err(err) => {
            warn!(participant = participant.id, error = %err, "skipping participant");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;
    use crate::state::game::Track;

    fn selection(name: &str) -> Selection {
        Selection {
            name: name.into(),
            artists: "Artist".into(),
        }
    }

    fn selections() -> Selections {
        let mut selections = Selections::new(selection("right"));
        for name in ["w1", "w2", "w3"] {
            selections.push_decoy(selection(name));
        }
        selections
    }

    fn playlist() -> Playlist {
        let tracks = ["a", "b", "c", "d"]
            .into_iter()
            .map(|id| Track {
                id: id.into(),
                name: id.into(),
                artists: vec![],
            })
            .collect();
        Playlist::new("abc", tracks)
    }

    fn join(session: &mut GameSession) -> (ParticipantId, UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (session.join(tx), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<OutboundMessage>) -> Vec<OutboundMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Leader plus one player, both named and in a started two-round game.
    fn started(
        session: &mut GameSession,
    ) -> (Generation, Vec<UnboundedReceiver<OutboundMessage>>) {
        let (leader, rx_leader) = join(session);
        let (player, rx_player) = join(session);
        session.accept_username(leader, "Alice".into()).unwrap();
        session.accept_username(player, "Bob".into()).unwrap();
        let ticket = session.begin_setup(leader).unwrap();
        assert!(session.start_game(ticket.generation, playlist(), 2, selections(), Instant::now()));
        (ticket.generation, vec![rx_leader, rx_player])
    }

    #[test]
    fn usernames_route_leader_and_players() {
        let mut session = GameSession::new();
        let (leader, mut rx_leader) = join(&mut session);
        let (player, mut rx_player) = join(&mut session);

        assert_eq!(
            session.accept_username(leader, "Alice".into()).unwrap(),
            ParticipantState::Configuring
        );
        assert_eq!(
            session.accept_username(player, "Bob".into()).unwrap(),
            ParticipantState::Ready
        );
        assert!(drain(&mut rx_leader).is_empty());
        assert_eq!(
            drain(&mut rx_player),
            [OutboundMessage::State(ParticipantState::Ready)]
        );

        assert!(session.deliver_playlists(leader, vec![]));
        assert_eq!(
            drain(&mut rx_leader),
            [
                OutboundMessage::Playlists(vec![]),
                OutboundMessage::State(ParticipantState::Configuring)
            ]
        );
        assert!(!session.deliver_playlists(player, vec![]));
    }

    #[test]
    fn only_the_leader_configures() {
        let mut session = GameSession::new();
        let (_, _rx_leader) = join(&mut session);
        let (player, _rx_player) = join(&mut session);
        assert!(matches!(
            session.begin_setup(player),
            Err(ServiceError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn cancelled_setup_leaves_session_idle() {
        let mut session = GameSession::new();
        let (leader, _rx) = join(&mut session);
        session.accept_username(leader, "Alice".into()).unwrap();

        let ticket = session.begin_setup(leader).unwrap();
        assert!(matches!(
            session.begin_setup(leader),
            Err(ServiceError::ProtocolViolation(_))
        ));
        session.cancel_setup(ticket);

        assert_eq!(session.rounds().stage(), RoundStage::Idle);
        assert!(session.rounds().scoreboard().is_empty());
        assert_eq!(session.state_of(leader).unwrap(), ParticipantState::Configuring);
    }

    #[test]
    fn start_game_enrolls_and_sends_selections() {
        let mut session = GameSession::new();
        let (_, mut receivers) = started(&mut session);

        for rx in &mut receivers {
            assert_eq!(drain(rx).last(), Some(&OutboundMessage::Selections(selections())));
        }
        assert_eq!(session.rounds().stage(), RoundStage::Answering);
        assert_eq!(session.rounds().scoreboard().len(), 2);
        assert_eq!(session.rounds().scoreboard().get(1).unwrap().username, "Bob");
    }

    #[test]
    fn stale_setup_is_dropped() {
        let mut session = GameSession::new();
        let (leader, _rx) = join(&mut session);
        session.accept_username(leader, "Alice".into()).unwrap();
        let ticket = session.begin_setup(leader).unwrap();
        session.abort_cycle(None, "catalog down");

        assert!(!session.start_game(ticket.generation, playlist(), 1, selections(), Instant::now()));
        assert_eq!(session.rounds().stage(), RoundStage::Idle);
    }

    #[test]
    fn last_answer_closes_barrier_once() {
        let mut session = GameSession::new();
        let (generation, mut receivers) = started(&mut session);
        let now = session.rounds().round().unwrap().started_at;

        assert_eq!(session.submit_answer(0, selection("right"), now).unwrap(), None);
        assert!(session.submit_answer(0, selection("right"), now).is_err());
        assert_eq!(
            session.submit_answer(1, selection("w1"), now).unwrap(),
            Some(generation)
        );

        let timer = session.close_round(generation).unwrap();
        assert!(session.close_round(generation).is_none());
        assert_eq!(session.rounds().scoreboard().get(0).unwrap().score, 1000);
        assert_eq!(session.rounds().scoreboard().get(1).unwrap().score, 0);

        let frames = drain(&mut receivers[1]);
        assert_eq!(
            frames[frames.len() - 2..],
            [
                OutboundMessage::State(ParticipantState::WaitingForOthers),
                OutboundMessage::Scoreboard(session.rounds().scoreboard().clone()),
            ]
        );
        assert!(session.rounds().is_current(timer));
    }

    #[test]
    fn departure_of_last_unanswered_closes_barrier() {
        let mut session = GameSession::new();
        let (_, _receivers) = started(&mut session);
        session
            .submit_answer(0, selection("right"), Instant::now())
            .unwrap();

        let departure = session.leave(1);
        assert!(departure.scoreboard_timer.is_some());
        assert_eq!(session.state_of(0).unwrap(), ParticipantState::ScoreboardDisplay);
        assert_eq!(session.rounds().scoreboard().get(1).unwrap().score, 0);
    }

    #[test]
    fn final_scoreboard_is_ranked_by_score() {
        let mut session = GameSession::new();
        let (leader, _rx_leader) = join(&mut session);
        let (player, mut rx_player) = join(&mut session);
        session.accept_username(leader, "Alice".into()).unwrap();
        session.accept_username(player, "Bob".into()).unwrap();
        let ticket = session.begin_setup(leader).unwrap();
        assert!(session.start_game(ticket.generation, playlist(), 1, selections(), Instant::now()));

        let now = session.rounds().round().unwrap().started_at;
        session.submit_answer(leader, selection("w1"), now).unwrap();
        let closed = session.submit_answer(player, selection("right"), now).unwrap();
        let timer = session.close_round(closed.unwrap()).unwrap();
        drain(&mut rx_player);

        assert!(matches!(
            session.conclude_scoreboard(timer),
            Some(Conclusion::Finished(_))
        ));
        let frames = drain(&mut rx_player);
        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[0].encode().unwrap(),
            r#"{"1":{"username":"Bob","score":1000},"0":{"username":"Alice","score":0}}"#
        );
        assert_eq!(frames[1], OutboundMessage::State(ParticipantState::GameOver));

        // The stored scoreboard keeps enrolment order.
        let ids: Vec<_> = session.rounds().scoreboard().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, [0, 1]);
    }

    #[test]
    fn scoreboard_leads_to_next_round_then_game_over() {
        let mut session = GameSession::new();
        let (generation, mut receivers) = started(&mut session);
        let now = session.rounds().round().unwrap().started_at;
        session.submit_answer(0, selection("right"), now).unwrap();
        session.submit_answer(1, selection("right"), now).unwrap();
        let timer = session.close_round(generation).unwrap();

        let Some(Conclusion::NextRound { generation, .. }) = session.conclude_scoreboard(timer) else {
            panic!("expected a second round");
        };
        assert!(session.advance_round(generation, selections(), now));
        assert_eq!(session.rounds().round_number(), 2);
        assert_eq!(session.state_of(1).unwrap(), ParticipantState::AwaitingAnswer);

        session
            .submit_answer(0, selection("right"), now + Duration::from_millis(400))
            .unwrap();
        session.submit_answer(1, selection("w2"), now).unwrap();
        let timer = session.close_round(generation).unwrap();
        let Some(Conclusion::Finished(finished)) = session.conclude_scoreboard(timer) else {
            panic!("expected the game to end");
        };
        assert_eq!(session.rounds().scoreboard().get(0).unwrap().score, 1980);

        drain(&mut receivers[0]);
        session.prompt_replay(finished);
        assert_eq!(
            drain(&mut receivers[0]),
            [OutboundMessage::State(ParticipantState::PlayAgainPrompt)]
        );
        let frames = drain(&mut receivers[1]);
        assert_eq!(
            frames.last(),
            Some(&OutboundMessage::State(ParticipantState::GameOver))
        );
    }

    #[test]
    fn leader_failover_promotes_ready_participant() {
        let mut session = GameSession::new();
        let (leader, _rx0) = join(&mut session);
        let (player, _rx1) = join(&mut session);
        session.accept_username(leader, "Alice".into()).unwrap();
        session.accept_username(player, "Bob".into()).unwrap();

        let departure = session.leave(leader);
        assert_eq!(departure.promoted, Some(player));
        assert_eq!(session.registry().leader(), Some(player));
        assert_eq!(session.state_of(player).unwrap(), ParticipantState::Configuring);
    }

    #[test]
    fn abort_returns_everyone_to_username_prompt() {
        let mut session = GameSession::new();
        let (generation, mut receivers) = started(&mut session);

        assert!(session.abort_cycle(Some(generation), "catalog unavailable"));
        assert!(!session.abort_cycle(Some(generation), "late failure"));

        for rx in &mut receivers {
            let frames = drain(rx);
            assert_eq!(
                frames[frames.len() - 2..],
                [
                    OutboundMessage::Error("catalog unavailable".into()),
                    OutboundMessage::State(ParticipantState::AwaitingUsername),
                ]
            );
        }
        assert_eq!(session.registry().leader(), Some(0));
        assert!(session.registry().iter().all(|p| p.username.is_none()));
        assert_eq!(session.rounds().stage(), RoundStage::Idle);
    }

    #[test]
    fn emptied_session_resets() {
        let mut session = GameSession::new();
        let (_, _receivers) = started(&mut session);
        session.leave(0);
        session.leave(1);

        assert_eq!(session.rounds().stage(), RoundStage::Idle);
        let (tx, _rx) = mpsc::unbounded_channel();
        assert_eq!(session.join(tx), 0);
    }
}
