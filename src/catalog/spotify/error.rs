//! Error types of the Spotify catalog implementation.

use reqwest::StatusCode;
use thiserror::Error;

use crate::catalog::CatalogError;

/// Convenient result alias returning [`SpotifyError`] failures.
pub type SpotifyResult<T> = Result<T, SpotifyError>;

/// Failures that can occur while talking to Spotify.
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// Required environment variable is missing.
    #[error("missing Spotify environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build Spotify client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent.
    #[error("failed to send Spotify request to `{url}`")]
    RequestSend {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// Spotify returned an unexpected status code.
    #[error("unexpected Spotify response status {status} for `{url}`")]
    RequestStatus { url: String, status: StatusCode },
    /// Response payload could not be decoded.
    #[error("failed to decode Spotify response for `{url}`")]
    DecodeResponse {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// Every attempt to refresh the access token failed.
    #[error("access token refresh failed after {attempts} attempts")]
    TokenRefresh { attempts: u32 },
    /// No access token has been obtained yet.
    #[error("no access token available")]
    NoAccessToken,
}

impl SpotifyError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SpotifyError::RequestStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<SpotifyError> for CatalogError {
    fn from(err: SpotifyError) -> Self {
        CatalogError::unavailable("spotify request failed", err)
    }
}
