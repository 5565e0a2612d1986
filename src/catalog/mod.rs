//! Music catalog integration used to drive playback and read track metadata.

#[cfg(feature = "spotify-catalog")]
pub mod spotify;

use std::error::Error;

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;

use crate::state::game::Track;

/// Result alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Playlist offered to the leader while configuring a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistSummary {
    /// Display name.
    pub name: String,
    /// Catalog identifier.
    #[serde(rename = "playlistID")]
    pub playlist_id: String,
}

/// Error raised by catalog backends once their own retry policy is exhausted.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog could not be reached or rejected the request.
    #[error("catalog unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The requested playlist does not exist or is not accessible.
    #[error("playlist `{0}` not found")]
    NotFound(String),
    /// Playback is stopped, there is no current track to quiz on.
    #[error("no track is currently playing")]
    NothingPlaying,
}

impl CatalogError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        CatalogError::Unavailable {
            message: message.into(),
            source: Box::new(source),
        }
    }
}

/// Abstraction over the music service: playlists, playback transport and the
/// currently playing track.
pub trait CatalogClient: Send + Sync {
    /// Playlists of the account the server is authorized for.
    fn fetch_playlists(&self) -> BoxFuture<'static, CatalogResult<Vec<PlaylistSummary>>>;
    /// Every track of a playlist.
    fn load_playlist(&self, playlist_id: &str) -> BoxFuture<'static, CatalogResult<Vec<Track>>>;
    /// Start playing the playlist on the active device.
    fn start_playback(&self, playlist_id: &str) -> BoxFuture<'static, CatalogResult<()>>;
    /// Track the device is playing right now.
    fn current_track(&self) -> BoxFuture<'static, CatalogResult<Track>>;
    /// Skip to the next track of the playback context.
    fn skip_next(&self) -> BoxFuture<'static, CatalogResult<()>>;
}
