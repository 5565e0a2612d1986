//! Wire models of the Spotify Web API responses the catalog reads.

use serde::Deserialize;

use crate::{catalog::PlaylistSummary, state::game::Track};

/// Paging object wrapping list endpoints.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Absolute URL of the next page, absent on the last page.
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SimplifiedPlaylist {
    pub id: String,
    pub name: String,
}

impl From<SimplifiedPlaylist> for PlaylistSummary {
    fn from(value: SimplifiedPlaylist) -> Self {
        Self {
            name: value.name,
            playlist_id: value.id,
        }
    }
}

/// Entry of a playlist; `track` is null for removed or unavailable items.
#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
pub struct TrackObject {
    /// Absent for local files.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistObject {
    pub name: String,
}

impl TrackObject {
    /// Convert into a catalog track, dropping items without an identity.
    pub fn into_track(self) -> Option<Track> {
        let id = self.id?;
        Some(Track {
            id,
            name: self.name,
            artists: self.artists.into_iter().map(|artist| artist.name).collect(),
        })
    }
}

/// Body of `GET /me/player/currently-playing`.
#[derive(Debug, Deserialize)]
pub struct CurrentlyPlaying {
    #[serde(default)]
    pub item: Option<TrackObject>,
}

/// Body of the refresh-token grant.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Spotify may rotate the refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}
