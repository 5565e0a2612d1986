use thiserror::Error;

use crate::{
    catalog::CatalogError,
    dto::ws::DecodeError,
    services::track_selector::SelectionError,
    state::{registry::UnknownParticipant, state_machine::InvalidTransition},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or out-of-state message; discarded without any state change.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// Rejected game configuration, reported to the leader only.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// The music catalog failed for good; fatal to the game cycle.
    #[error("catalog failure")]
    ExternalService(#[from] CatalogError),
    /// Participant is not (or no longer) connected.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<DecodeError> for ServiceError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::InvalidSetup(message) => ServiceError::Configuration(message),
            other => ServiceError::ProtocolViolation(other.to_string()),
        }
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::ProtocolViolation(err.to_string())
    }
}

impl From<UnknownParticipant> for ServiceError {
    fn from(err: UnknownParticipant) -> Self {
        ServiceError::NotFound(err.to_string())
    }
}

impl From<SelectionError> for ServiceError {
    fn from(err: SelectionError) -> Self {
        ServiceError::Configuration(err.to_string())
    }
}
