use axum::Router;

use crate::state::SharedState;

/// Liveness route.
pub mod health;
/// Session inspection route.
pub mod session;
/// Participant WebSocket endpoint.
pub mod websocket;

/// Compose all route trees and wire in the shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(session::router())
        .merge(websocket::router())
        .with_state(state)
}
