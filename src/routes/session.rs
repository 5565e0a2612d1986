use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::session::SessionSnapshot, state::SharedState};

/// Read-only snapshot of the game session, for diagnostics.
pub async fn session_snapshot(State(state): State<SharedState>) -> Json<SessionSnapshot> {
    Json(state.with_session(|session| session.snapshot()).await)
}

/// Configure the session inspection route.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/session", get(session_snapshot))
}
