//! Inbound side of the session: every text frame is decoded against the
//! sender's state and dispatched to the matching handler.

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    catalog::CatalogError,
    dto::ws::{GameSetup, InboundMessage, OutboundMessage, ReplayChoice},
    error::ServiceError,
    services::{
        round_service::{self, Playback},
        track_selector::ensure_playable,
    },
    state::{
        SharedState,
        game::{Playlist, Selection, Selections},
        registry::{Outbox, ParticipantId},
        state_machine::ParticipantState,
    },
};

/// Register a freshly accepted connection.
pub async fn connect(state: &SharedState, outbox: Outbox) -> ParticipantId {
    state.with_session(|session| session.join(outbox)).await
}

/// Handle one text frame. Failures never close the connection: protocol
/// violations are logged and dropped, configuration errors go back to the
/// sender, catalog failures end the game cycle for everyone.
pub async fn handle_text(state: &SharedState, id: ParticipantId, text: &str) {
    if let Err(err) = dispatch(state, id, text).await {
        report(state, id, err).await;
    }
}

/// Reconcile the session after a connection closed.
pub async fn disconnect(state: &SharedState, id: ParticipantId) {
    let departure = state.with_session(|session| session.leave(id)).await;
    if let Some(generation) = departure.scoreboard_timer {
        round_service::schedule_scoreboard(state.clone(), generation);
    }
    if let Some(leader) = departure.promoted {
        if let Err(err) = send_playlists(state, leader).await {
            report(state, leader, err).await;
        }
    }
}

async fn dispatch(state: &SharedState, id: ParticipantId, text: &str) -> Result<(), ServiceError> {
    let current = state.with_session(|session| session.state_of(id)).await?;
    let message = InboundMessage::decode(current, text)?;
    debug!(participant = id, state = ?current, message = ?message, "dispatching message");

    match message {
        InboundMessage::Username(username) => on_username(state, id, username).await,
        InboundMessage::Setup(setup) => on_setup(state, id, setup).await,
        InboundMessage::Answer(answer) => on_answer(state, id, answer).await,
        InboundMessage::ReplayChoice(ReplayChoice::PlayAgain) => {
            round_service::replay(state, id).await
        }
        InboundMessage::ReplayChoice(ReplayChoice::NewGame) => {
            state
                .with_session(|session| session.discard_game(id))
                .await
        }
    }
}

async fn report(state: &SharedState, id: ParticipantId, err: ServiceError) {
    match err {
        ServiceError::ProtocolViolation(reason) => {
            warn!(participant = id, %reason, "discarding message");
        }
        ServiceError::Configuration(reason) => {
            warn!(participant = id, %reason, "rejecting game configuration");
            state
                .with_session(|session| session.notify(id, OutboundMessage::Error(reason)))
                .await;
        }
        ServiceError::NotFound(reason) => {
            debug!(participant = id, %reason, "message from departed participant");
        }
        err @ ServiceError::ExternalService(_) => round_service::abort(state, None, err).await,
    }
}

async fn on_username(
    state: &SharedState,
    id: ParticipantId,
    username: String,
) -> Result<(), ServiceError> {
    let next = state
        .with_session(|session| session.accept_username(id, username))
        .await?;
    if next == ParticipantState::Configuring {
        send_playlists(state, id).await?;
    }
    Ok(())
}

/// Fetch the playlists for a leader that just started configuring.
async fn send_playlists(state: &SharedState, id: ParticipantId) -> Result<(), ServiceError> {
    let playlists = state.catalog().fetch_playlists().await?;
    info!(participant = id, count = playlists.len(), "playlists fetched");
    state
        .with_session(|session| session.deliver_playlists(id, playlists))
        .await;
    Ok(())
}

async fn on_setup(state: &SharedState, id: ParticipantId, setup: GameSetup) -> Result<(), ServiceError> {
    let ticket = state.with_session(|session| session.begin_setup(id)).await?;
    info!(
        participant = id,
        playlist = %setup.playlist_id,
        max_rounds = setup.max_rounds,
        "configuring game"
    );

    match load_first_round(state, &setup).await {
        Ok((playlist, selections)) => {
            state
                .with_session(|session| {
                    session.start_game(
                        ticket.generation,
                        playlist,
                        setup.max_rounds,
                        selections,
                        Instant::now(),
                    )
                })
                .await;
            Ok(())
        }
        Err(err @ ServiceError::ExternalService(_)) => {
            round_service::abort(state, Some(ticket.generation), err).await;
            Ok(())
        }
        Err(err) => {
            state
                .with_session(|session| session.cancel_setup(ticket))
                .await;
            Err(err)
        }
    }
}

async fn load_first_round(
    state: &SharedState,
    setup: &GameSetup,
) -> Result<(Playlist, Selections), ServiceError> {
    let tracks = state
        .catalog()
        .load_playlist(&setup.playlist_id)
        .await
        .map_err(|err| match err {
            CatalogError::NotFound(id) => {
                ServiceError::Configuration(format!("playlist `{id}` not found"))
            }
            other => other.into(),
        })?;
    let playlist = Playlist::new(setup.playlist_id.clone(), tracks);
    ensure_playable(&playlist)?;

    let selections = round_service::prepare_selections(state, &playlist, Playback::Start).await?;
    Ok((playlist, selections))
}

async fn on_answer(state: &SharedState, id: ParticipantId, answer: Selection) -> Result<(), ServiceError> {
    let timer = state
        .with_session(|session| -> Result<_, ServiceError> {
            let closed = session.submit_answer(id, answer, Instant::now())?;
            Ok(closed.and_then(|generation| session.close_round(generation)))
        })
        .await?;
    if let Some(generation) = timer {
        round_service::schedule_scoreboard(state.clone(), generation);
    }
    Ok(())
}
