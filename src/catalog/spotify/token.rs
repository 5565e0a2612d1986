//! Access-token lifecycle for the Spotify catalog.

use std::sync::Arc;

use reqwest::Client;
use tokio::{sync::RwLock, time::sleep};
use tracing::{error, info, warn};

use super::{
    config::SpotifyConfig,
    error::{SpotifyError, SpotifyResult},
    models::TokenResponse,
};

/// Holder of the current access token, refreshed with the long-lived refresh token.
pub struct TokenSource {
    client: Client,
    config: SpotifyConfig,
    access_token: RwLock<Option<String>>,
    refresh_token: RwLock<String>,
}

impl TokenSource {
    /// Create a source with no access token yet.
    pub fn new(client: Client, config: SpotifyConfig) -> Self {
        let refresh_token = RwLock::new(config.refresh_token.clone());
        Self {
            client,
            config,
            access_token: RwLock::new(None),
            refresh_token,
        }
    }

    /// Current access token.
    pub async fn access_token(&self) -> SpotifyResult<String> {
        self.access_token
            .read()
            .await
            .clone()
            .ok_or(SpotifyError::NoAccessToken)
    }

    /// Exchange the refresh token for a new access token, once.
    pub async fn refresh(&self) -> SpotifyResult<()> {
        let url = format!(
            "{}/api/token",
            self.config.accounts_base_url.trim_end_matches('/')
        );
        let refresh_token = self.refresh_token.read().await.clone();

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|source| SpotifyError::RequestSend {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(SpotifyError::RequestStatus {
                url,
                status: response.status(),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|source| SpotifyError::DecodeResponse {
                url: url.clone(),
                source,
            })?;

        *self.access_token.write().await = Some(body.access_token);
        if let Some(rotated) = body.refresh_token {
            *self.refresh_token.write().await = rotated;
        }
        Ok(())
    }

    /// Refresh the access token, retrying with the configured policy.
    pub async fn refresh_with_retry(&self) -> SpotifyResult<()> {
        let attempts = self.config.refresh_attempts.max(1);
        for attempt in 1..=attempts {
            match self.refresh().await {
                Ok(()) => {
                    info!("access token has been refreshed");
                    return Ok(());
                }
                Err(err) => {
                    warn!(attempt, error = %err, "access token refresh attempt failed");
                    if attempt < attempts {
                        sleep(self.config.refresh_retry_delay).await;
                    }
                }
            }
        }
        Err(SpotifyError::TokenRefresh { attempts })
    }
}

/// Keep the access token fresh in the background.
///
/// Returns only when a refresh failed for good; the catalog cannot work
/// without a token, so the caller is expected to shut down.
pub async fn run_token_refresher(tokens: Arc<TokenSource>) -> SpotifyError {
    loop {
        sleep(tokens.config.refresh_every).await;
        if let Err(err) = tokens.refresh_with_retry().await {
            error!(error = %err, "giving up on access token refresh");
            return err;
        }
    }
}
