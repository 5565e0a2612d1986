//! Round lifecycle driven outside of inbound messages: catalog round trips to
//! build the answer set, the scoreboard and replay-prompt timers, and the
//! fatal reset when the catalog gives up.
//!
//! Every step carries the [`Generation`] it was issued with; the session drops
//! whatever a superseded step produces.

use tokio::time::{Instant, sleep};
use tracing::{debug, error};

use crate::{
    error::ServiceError,
    services::track_selector::select_tracks,
    state::{
        SharedState,
        game::{Playlist, Selections},
        registry::ParticipantId,
        round::Generation,
        session::Conclusion,
    },
};

/// Playback command issued before reading the current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    /// Start playing the playlist from the top.
    Start,
    /// Skip to the next track of the running playlist.
    Skip,
}

/// Drive playback, let it settle, then build the answer set around the track
/// that is playing.
pub async fn prepare_selections(
    state: &SharedState,
    playlist: &Playlist,
    playback: Playback,
) -> Result<Selections, ServiceError> {
    let catalog = state.catalog();
    match playback {
        Playback::Start => catalog.start_playback(&playlist.id).await?,
        Playback::Skip => catalog.skip_next().await?,
    }
    sleep(state.config().timings().skip_settle).await;

    let current = catalog.current_track().await?;
    debug!(track = %current.id, "current track fetched");
    let selections = select_tracks(playlist, &current, &mut rand::rng())?;
    Ok(selections)
}

/// Start the scoreboard delay of a scored round.
pub fn schedule_scoreboard(state: SharedState, generation: Generation) {
    tokio::spawn(async move {
        sleep(state.config().timings().scoreboard_display).await;
        let conclusion = state
            .with_session(|session| session.conclude_scoreboard(generation))
            .await;
        match conclusion {
            Some(Conclusion::NextRound {
                generation,
                playlist,
            }) => advance(&state, generation, playlist).await,
            Some(Conclusion::Finished(generation)) => schedule_replay_prompt(state, generation),
            None => debug!(%generation, "scoreboard delay superseded"),
        }
    });
}

/// Ask the leader about a replay once the prompt delay elapsed.
pub fn schedule_replay_prompt(state: SharedState, generation: Generation) {
    tokio::spawn(async move {
        sleep(state.config().timings().replay_prompt_delay).await;
        state
            .with_session(|session| session.prompt_replay(generation))
            .await;
    });
}

async fn advance(state: &SharedState, generation: Generation, playlist: Playlist) {
    match prepare_selections(state, &playlist, Playback::Skip).await {
        Ok(selections) => {
            state
                .with_session(|session| session.advance_round(generation, selections, Instant::now()))
                .await;
        }
        Err(err) => abort(state, Some(generation), err).await,
    }
}

/// Replay the finished game with the same playlist, from round one.
pub async fn replay(state: &SharedState, leader: ParticipantId) -> Result<(), ServiceError> {
    let (generation, playlist) = state
        .with_session(|session| session.begin_replay(leader))
        .await?;
    match prepare_selections(state, &playlist, Playback::Skip).await {
        Ok(selections) => {
            state
                .with_session(|session| session.restart_game(generation, selections, Instant::now()))
                .await;
        }
        Err(err) => abort(state, Some(generation), err).await,
    }
    Ok(())
}

/// Terminate the game cycle, unless `generation` was already superseded.
pub async fn abort(state: &SharedState, generation: Option<Generation>, err: ServiceError) {
    let reason = match &err {
        ServiceError::ExternalService(source) => format!("music catalog failure: {source}"),
        other => other.to_string(),
    };
    error!(generation = ?generation, error = %reason, "game cycle failed");
    state
        .with_session(|session| session.abort_cycle(generation, &reason))
        .await;
}
