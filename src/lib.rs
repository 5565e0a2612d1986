//! Library crate for track-quiz-back, exposing modules for the binary and integration tests.

pub mod catalog;
pub mod config;
/// Wire and HTTP payloads.
pub mod dto;
/// Service-level error taxonomy.
pub mod error;
/// HTTP and WebSocket routes.
pub mod routes;
/// Message handling and the round lifecycle.
pub mod services;
/// Shared application state and the game session.
pub mod state;
