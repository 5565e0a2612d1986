use std::time::Duration;

use super::error::{SpotifyError, SpotifyResult};

const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";

/// Runtime configuration describing how to reach the Spotify Web API.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    /// Application client id (`CLIENT_ID`).
    pub client_id: String,
    /// Application client secret (`CLIENT_SECRET`).
    pub client_secret: String,
    /// Long-lived token of the authorized account (`REFRESH_TOKEN`).
    pub refresh_token: String,
    /// Web API root, without trailing slash.
    pub api_base_url: String,
    /// Accounts service root used for the token grant.
    pub accounts_base_url: String,
    /// Interval between two proactive access-token refreshes.
    pub refresh_every: Duration,
    /// Attempts made before a token refresh is considered failed for good.
    pub refresh_attempts: u32,
    /// Pause between two refresh attempts.
    pub refresh_retry_delay: Duration,
}

impl SpotifyConfig {
    /// Construct a configuration from explicit credentials and the public endpoints.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            api_base_url: DEFAULT_API_BASE_URL.into(),
            accounts_base_url: DEFAULT_ACCOUNTS_BASE_URL.into(),
            refresh_every: Duration::from_secs(55 * 60),
            refresh_attempts: 100,
            refresh_retry_delay: Duration::from_secs(5),
        }
    }

    /// Point the client at other endpoints (self-hosted mocks, proxies).
    pub fn with_base_urls(
        mut self,
        api_base_url: impl Into<String>,
        accounts_base_url: impl Into<String>,
    ) -> Self {
        self.api_base_url = api_base_url.into();
        self.accounts_base_url = accounts_base_url.into();
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> SpotifyResult<Self> {
        let client_id = std::env::var("CLIENT_ID")
            .map_err(|_| SpotifyError::MissingEnvVar { var: "CLIENT_ID" })?;
        let client_secret = std::env::var("CLIENT_SECRET")
            .map_err(|_| SpotifyError::MissingEnvVar { var: "CLIENT_SECRET" })?;
        let refresh_token = std::env::var("REFRESH_TOKEN")
            .map_err(|_| SpotifyError::MissingEnvVar { var: "REFRESH_TOKEN" })?;

        let mut config = Self::new(client_id, client_secret, refresh_token);

        if let (Some(api), Some(accounts)) = (
            std::env::var("SPOTIFY_API_BASE_URL").ok(),
            std::env::var("SPOTIFY_ACCOUNTS_BASE_URL").ok(),
        ) {
            config = config.with_base_urls(api, accounts);
        }

        Ok(config)
    }
}
