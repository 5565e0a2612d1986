/// `/healthcheck` payload.
pub mod health;
/// `/session` snapshot.
pub mod session;
/// Field validators.
pub mod validation;
/// Participant WebSocket messages.
pub mod ws;
