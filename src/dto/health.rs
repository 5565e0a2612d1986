use serde::Serialize;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status, always "ok" while the server answers.
    pub status: String,
    /// Number of connected participants.
    pub participants: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(participants: usize) -> Self {
        Self {
            status: "ok".to_string(),
            participants,
        }
    }
}
