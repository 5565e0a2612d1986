use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    catalog::{CatalogClient, CatalogError, CatalogResult, PlaylistSummary},
    state::game::Track,
};

use super::{
    config::SpotifyConfig,
    error::{SpotifyError, SpotifyResult},
    models::{CurrentlyPlaying, Page, PlaylistItem, SimplifiedPlaylist, TrackObject},
    token::TokenSource,
};

const MAX_REQUEST_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);

/// Spotify Web API client acting on behalf of one authorized account.
#[derive(Clone)]
pub struct SpotifyCatalog {
    client: Client,
    api_base_url: Arc<str>,
    tokens: Arc<TokenSource>,
}

impl SpotifyCatalog {
    /// Build the HTTP client and obtain a first access token.
    pub async fn connect(config: SpotifyConfig) -> SpotifyResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| SpotifyError::ClientBuilder { source })?;

        let api_base_url = Arc::<str>::from(config.api_base_url.trim_end_matches('/'));
        let tokens = Arc::new(TokenSource::new(client.clone(), config));
        tokens.refresh_with_retry().await?;

        Ok(Self {
            client,
            api_base_url,
            tokens,
        })
    }

    /// Token source, to hand to [`run_token_refresher`](super::run_token_refresher).
    pub fn tokens(&self) -> Arc<TokenSource> {
        self.tokens.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path)
    }

    /// Send a request, retrying transport failures, rate limiting and server
    /// errors with exponential backoff. An expired token is refreshed once.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> SpotifyResult<Response> {
        let mut backoff = INITIAL_BACKOFF;
        let mut refreshed = false;
        let mut attempt = 1;

        loop {
            let token = self.tokens.access_token().await?;
            let mut builder = self
                .client
                .request(method.clone(), url)
                .bearer_auth(token);
            builder = match body {
                Some(body) => builder.json(body),
                None => builder.header(reqwest::header::CONTENT_LENGTH, 0),
            };

            let outcome = builder
                .send()
                .await
                .map_err(|source| SpotifyError::RequestSend {
                    url: url.to_string(),
                    source,
                })
                .and_then(|response| {
                    if response.status().is_success() {
                        Ok(response)
                    } else {
                        Err(SpotifyError::RequestStatus {
                            url: url.to_string(),
                            status: response.status(),
                        })
                    }
                });

            let err = match outcome {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if err.status() == Some(StatusCode::UNAUTHORIZED) && !refreshed {
                debug!(%url, "access token rejected, refreshing");
                refreshed = true;
                self.tokens.refresh_with_retry().await?;
                continue;
            }

            let retryable = match err.status() {
                Some(status) => {
                    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
                }
                None => matches!(err, SpotifyError::RequestSend { .. }),
            };
            if !retryable || attempt >= MAX_REQUEST_ATTEMPTS {
                return Err(err);
            }

            warn!(%url, attempt, error = %err, "Spotify request failed, retrying");
            sleep(backoff).await;
            backoff *= 2;
            attempt += 1;
        }
    }

    async fn get_json<T>(&self, url: &str) -> SpotifyResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(Method::GET, url, None).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| SpotifyError::DecodeResponse {
                url: url.to_string(),
                source,
            })
    }

    /// Walk a paginated endpoint until the last page.
    async fn get_all_pages<T>(&self, first_url: String) -> SpotifyResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut next = Some(first_url);
        while let Some(url) = next {
            let page: Page<T> = self.get_json(&url).await?;
            items.extend(page.items);
            next = page.next;
        }
        Ok(items)
    }

    async fn playlists(&self) -> SpotifyResult<Vec<PlaylistSummary>> {
        let playlists: Vec<SimplifiedPlaylist> =
            self.get_all_pages(self.url("me/playlists?limit=50")).await?;
        Ok(playlists.into_iter().map(Into::into).collect())
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> CatalogResult<Vec<Track>> {
        let url = self.url(&format!("playlists/{playlist_id}/tracks?limit=100"));
        let items: Vec<PlaylistItem> = match self.get_all_pages(url).await {
            Ok(items) => items,
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND) => {
                return Err(CatalogError::NotFound(playlist_id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(items
            .into_iter()
            .filter_map(|item| item.track)
            .filter_map(TrackObject::into_track)
            .collect())
    }

    async fn play(&self, playlist_id: &str) -> SpotifyResult<()> {
        let body = json!({ "context_uri": format!("spotify:playlist:{playlist_id}") });
        self.send(Method::PUT, &self.url("me/player/play"), Some(&body))
            .await?;
        debug!(%playlist_id, "started playing playlist");
        Ok(())
    }

    async fn currently_playing(&self) -> CatalogResult<Track> {
        let url = self.url("me/player/currently-playing");
        let response = self.send(Method::GET, &url, None).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Err(CatalogError::NothingPlaying);
        }
        let body: CurrentlyPlaying = response
            .json()
            .await
            .map_err(|source| SpotifyError::DecodeResponse { url, source })?;
        body.item
            .and_then(TrackObject::into_track)
            .ok_or(CatalogError::NothingPlaying)
    }

    async fn next(&self) -> SpotifyResult<()> {
        self.send(Method::POST, &self.url("me/player/next"), None)
            .await?;
        Ok(())
    }
}

impl CatalogClient for SpotifyCatalog {
    fn fetch_playlists(&self) -> BoxFuture<'static, CatalogResult<Vec<PlaylistSummary>>> {
        let catalog = self.clone();
        Box::pin(async move { Ok(catalog.playlists().await?) })
    }

    fn load_playlist(&self, playlist_id: &str) -> BoxFuture<'static, CatalogResult<Vec<Track>>> {
        let catalog = self.clone();
        let playlist_id = playlist_id.to_string();
        Box::pin(async move { catalog.playlist_tracks(&playlist_id).await })
    }

    fn start_playback(&self, playlist_id: &str) -> BoxFuture<'static, CatalogResult<()>> {
        let catalog = self.clone();
        let playlist_id = playlist_id.to_string();
        Box::pin(async move { Ok(catalog.play(&playlist_id).await?) })
    }

    fn current_track(&self) -> BoxFuture<'static, CatalogResult<Track>> {
        let catalog = self.clone();
        Box::pin(async move { catalog.currently_playing().await })
    }

    fn skip_next(&self) -> BoxFuture<'static, CatalogResult<()>> {
        let catalog = self.clone();
        Box::pin(async move { Ok(catalog.next().await?) })
    }
}
