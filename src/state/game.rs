//! Runtime representation of the music the game is played with.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Label of the entry holding the track that is actually playing.
pub const CURRENT_TRACK_LABEL: &str = "current track";
/// Number of decoys presented next to the current track.
pub const DECOY_COUNT: usize = 3;
/// Smallest playlist a game can be configured with.
pub const MIN_PLAYLIST_TRACKS: usize = DECOY_COUNT + 1;

/// A single track as reported by the music catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Catalog identifier, used to tell tracks apart.
    pub id: String,
    /// Raw track title, possibly carrying a featuring suffix.
    pub name: String,
    /// Artist names in catalog order.
    pub artists: Vec<String>,
}

/// Immutable list of tracks loaded once per game configuration.
#[derive(Debug, Clone)]
pub struct Playlist {
    /// Identifier the leader configured the game with.
    pub id: String,
    tracks: Arc<[Track]>,
}

impl Playlist {
    /// Wrap the loaded tracks; the list is read-only from here on.
    pub fn new(id: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self {
            id: id.into(),
            tracks: tracks.into(),
        }
    }

    /// All tracks of the playlist.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of tracks loaded.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the playlist has no track at all.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Display form of a track as shown to participants and echoed back as an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Track title without featuring suffix.
    pub name: String,
    /// Comma separated artist names.
    pub artists: String,
}

/// The answer set of one round: the current track plus the decoys, keyed by label.
///
/// Labels keep insertion order so the current track is always serialized first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Selections(IndexMap<String, Selection>);

impl Selections {
    /// Start an answer set from the current track.
    pub fn new(current: Selection) -> Self {
        let mut entries = IndexMap::with_capacity(DECOY_COUNT + 1);
        entries.insert(CURRENT_TRACK_LABEL.to_string(), current);
        Self(entries)
    }

    /// Append the next decoy under the following `random track N` slot.
    pub fn push_decoy(&mut self, decoy: Selection) {
        let label = format!("random track {}", self.0.len());
        self.0.insert(label, decoy);
    }

    /// The entry every correct answer must match.
    pub fn current(&self) -> &Selection {
        // The constructor always inserts the current track first.
        &self.0[0]
    }

    /// Decoy entries, in slot order.
    pub fn decoys(&self) -> impl Iterator<Item = &Selection> {
        self.0.values().skip(1)
    }

    /// Number of entries, current track included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty (never true for a constructed set).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(label, selection)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Selection)> {
        self.0.iter()
    }
}
