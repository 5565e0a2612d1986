/// Health check service.
pub mod health_service;
/// Round lifecycle: answer set preparation, timers and fatal resets.
pub mod round_service;
/// Inbound message handling for the game session.
pub mod session_service;
/// Answer set construction from a playlist.
pub mod track_selector;
/// WebSocket connection handling service.
pub mod websocket_service;
