//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a playlist identifier is not blank.
///
/// Surrounding whitespace is tolerated (the decoder trims it), an identifier
/// made only of whitespace is not.
pub fn validate_playlist_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        let mut err = ValidationError::new("playlist_id_blank");
        err.message = Some("Playlist ID must not be empty".into());
        return Err(err);
    }

    Ok(())
}
