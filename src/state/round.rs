//! Shared state of the active round: selections, scoreboard, round counter,
//! the answer barrier and the generation token guarding round advances.

use std::{collections::BTreeSet, fmt, time::Duration};

use indexmap::IndexMap;
use serde::Serialize;
use tokio::time::Instant;

use crate::state::{
    game::{Playlist, Selection, Selections},
    registry::ParticipantId,
};

/// Points awarded to an instant correct answer.
pub const MAX_ROUND_POINTS: i64 = 1000;

/// Monotonic token identifying one claim on the round lifecycle.
///
/// Every step that suspends (catalog calls, timers) carries the token it was
/// issued with and must present it again before committing; a token that is no
/// longer current means another step superseded it and the result is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Game-level stage, shared by every participant of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStage {
    /// No game configured.
    Idle,
    /// Catalog calls for the next round are in flight.
    Preparing,
    /// Selections are out, answers are being collected.
    Answering,
    /// Round scored, scoreboard delay running.
    Scoreboard,
    /// Last round scored, waiting for the leader's replay decision.
    Finished,
}

/// Score line of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreEntry {
    /// Username at the time the game started.
    pub username: String,
    /// Cumulative score, never decreasing within a game cycle.
    pub score: u32,
}

/// Scores keyed by participant id, in the order participants joined the game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Scoreboard(IndexMap<ParticipantId, ScoreEntry>);

impl Scoreboard {
    /// Add (or reset to zero) the entry of a participant.
    pub fn enroll(&mut self, id: ParticipantId, username: impl Into<String>) {
        self.0.insert(
            id,
            ScoreEntry {
                username: username.into(),
                score: 0,
            },
        );
    }

    /// Increase a participant's score.
    pub fn award(&mut self, id: ParticipantId, points: u32) {
        if let Some(entry) = self.0.get_mut(&id) {
            entry.score = entry.score.saturating_add(points);
        }
    }

    /// Score line of a participant.
    pub fn get(&self, id: ParticipantId) -> Option<&ScoreEntry> {
        self.0.get(&id)
    }

    /// Iterate over `(id, entry)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &ScoreEntry)> {
        self.0.iter()
    }

    /// Number of enrolled participants.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nobody is enrolled.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy ordered by descending score; ties keep enrolment order.
    pub fn ranked(&self) -> Scoreboard {
        let mut ranked = self.0.clone();
        ranked.sort_by(|_, a, _, b| b.score.cmp(&a.score));
        Scoreboard(ranked)
    }
}

/// One round's answer set together with the instant it was presented.
///
/// Both are replaced together, so latency is always measured against the
/// selections the participant actually saw.
#[derive(Debug, Clone)]
pub struct Round {
    /// 1-based round number.
    pub number: u32,
    /// Answer set presented to participants.
    pub selections: Selections,
    /// When the selections were committed.
    pub started_at: Instant,
}

/// Countdown of participants that still owe an answer for the active round.
#[derive(Debug, Default)]
pub struct AnswerBarrier {
    armed: Option<Generation>,
    outstanding: BTreeSet<ParticipantId>,
}

impl AnswerBarrier {
    /// Start counting down for the given participants.
    pub fn arm(&mut self, generation: Generation, participants: impl IntoIterator<Item = ParticipantId>) {
        self.armed = Some(generation);
        self.outstanding = participants.into_iter().collect();
    }

    /// Mark a participant as done (answered or departed).
    ///
    /// Returns the generation the barrier was armed with the first time the
    /// countdown reaches zero, and `None` on every other call.
    pub fn resolve(&mut self, id: ParticipantId) -> Option<Generation> {
        self.armed?;
        self.outstanding.remove(&id);
        if self.outstanding.is_empty() {
            self.armed.take()
        } else {
            None
        }
    }

    /// Number of participants still expected to answer.
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    fn clear(&mut self) {
        self.armed = None;
        self.outstanding.clear();
    }
}

/// Owner of the single active round.
#[derive(Debug)]
pub struct RoundCoordinator {
    generation: u64,
    stage: RoundStage,
    playlist: Option<Playlist>,
    max_rounds: u32,
    round: Option<Round>,
    scoreboard: Scoreboard,
    barrier: AnswerBarrier,
    replay_prompted: bool,
}

impl Default for RoundCoordinator {
    fn default() -> Self {
        Self {
            generation: 0,
            stage: RoundStage::Idle,
            playlist: None,
            max_rounds: 0,
            round: None,
            scoreboard: Scoreboard::default(),
            barrier: AnswerBarrier::default(),
            replay_prompted: false,
        }
    }
}

impl RoundCoordinator {
    /// Create an idle coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `generation` is still the one allowed to commit.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation.0
    }

    /// Invalidate every outstanding token and issue a fresh one.
    pub fn claim(&mut self, stage: RoundStage) -> Generation {
        self.generation += 1;
        self.stage = stage;
        Generation(self.generation)
    }

    /// Current stage.
    pub fn stage(&self) -> RoundStage {
        self.stage
    }

    /// Move to another stage without issuing a new token.
    pub fn set_stage(&mut self, stage: RoundStage) {
        self.stage = stage;
    }

    /// Whether a new game may be configured right now.
    pub fn accepts_setup(&self) -> bool {
        matches!(self.stage, RoundStage::Idle | RoundStage::Finished)
    }

    /// Playlist of the configured game.
    pub fn playlist(&self) -> Option<&Playlist> {
        self.playlist.as_ref()
    }

    /// Configured number of rounds (0 when idle).
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Active round, if any.
    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// Number of the active round (0 when idle).
    pub fn round_number(&self) -> u32 {
        self.round.as_ref().map_or(0, |round| round.number)
    }

    /// Whether the active round is the last one.
    pub fn is_last_round(&self) -> bool {
        self.round_number() >= self.max_rounds
    }

    /// Cumulative scores.
    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// Mutable access to the scores, for enrolment.
    pub fn scoreboard_mut(&mut self) -> &mut Scoreboard {
        &mut self.scoreboard
    }

    /// Answer barrier of the active round.
    pub fn barrier(&self) -> &AnswerBarrier {
        &self.barrier
    }

    /// Whether the leader has already been asked about a replay.
    pub fn replay_prompted(&self) -> bool {
        self.replay_prompted
    }

    /// Record that the replay prompt went out.
    pub fn mark_replay_prompted(&mut self) {
        self.replay_prompted = true;
    }

    /// Install the configuration of a fresh game: playlist, round count and an empty scoreboard.
    pub fn configure(&mut self, playlist: Playlist, max_rounds: u32) {
        self.playlist = Some(playlist);
        self.max_rounds = max_rounds;
        self.scoreboard = Scoreboard::default();
        self.replay_prompted = false;
    }

    /// Clear scores while keeping the playlist, for a replay.
    pub fn restart(&mut self) {
        self.scoreboard = Scoreboard::default();
        self.round = None;
        self.replay_prompted = false;
    }

    /// Replace the active round and arm the barrier for `participants`.
    pub fn commit_round(
        &mut self,
        generation: Generation,
        number: u32,
        selections: Selections,
        started_at: Instant,
        participants: impl IntoIterator<Item = ParticipantId>,
    ) {
        self.round = Some(Round {
            number,
            selections,
            started_at,
        });
        self.barrier.arm(generation, participants);
        self.stage = RoundStage::Answering;
    }

    /// Time elapsed since the active round's selections were committed.
    pub fn latency(&self, now: Instant) -> Option<Duration> {
        self.round
            .as_ref()
            .map(|round| now.saturating_duration_since(round.started_at))
    }

    /// Resolve a participant from the barrier, see [`AnswerBarrier::resolve`].
    pub fn resolve(&mut self, id: ParticipantId) -> Option<Generation> {
        self.barrier.resolve(id)
    }

    /// Award points for one answer, returning the points granted.
    pub fn score_answer(&mut self, id: ParticipantId, answer: &Selection, latency: Duration) -> u32 {
        let Some(round) = self.round.as_ref() else {
            return 0;
        };
        if answer != round.selections.current() {
            return 0;
        }
        let points = points_for_latency(latency);
        self.scoreboard.award(id, points);
        points
    }

    /// Drop every trace of the game and invalidate in-flight work.
    pub fn reset(&mut self) -> Generation {
        let generation = self.claim(RoundStage::Idle);
        self.playlist = None;
        self.max_rounds = 0;
        self.round = None;
        self.scoreboard = Scoreboard::default();
        self.barrier.clear();
        self.replay_prompted = false;
        generation
    }
}

/// Points for a correct answer: `1000 - round(sqrt(latency_ms))`, never below zero.
pub fn points_for_latency(latency: Duration) -> u32 {
    let millis = latency.as_millis() as f64;
    let penalty = millis.sqrt().round() as i64;
    (MAX_ROUND_POINTS - penalty).max(0) as u32
}
