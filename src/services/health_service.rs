use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness together with the number of connected participants.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let participants = state
        .with_session(|session| session.registry().len())
        .await;
    HealthResponse::ok(participants)
}
