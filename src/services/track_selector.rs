//! Builds the answer set of a round from the loaded playlist and the track
//! that is currently playing.

use std::collections::HashSet;

use rand::{Rng, seq::IndexedRandom};
use thiserror::Error;

use crate::state::game::{DECOY_COUNT, MIN_PLAYLIST_TRACKS, Playlist, Selection, Selections, Track};

/// Featuring markers stripped from display names, matched case-insensitively
/// right after a whitespace character.
const FEATURING_MARKERS: [&str; 2] = ["(feat.", "(with"];

/// Reasons a playlist cannot produce a full answer set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Fewer tracks than one current track plus the decoys.
    #[error("playlist must have at least {MIN_PLAYLIST_TRACKS} tracks, got {0}")]
    TooSmall(usize),
    /// Enough entries, but too many of them are the same track.
    #[error("playlist needs at least {DECOY_COUNT} distinct tracks besides the one playing")]
    NotEnoughDistinct,
}

/// Check that `playlist` can feed rounds at all, before anything is committed.
pub fn ensure_playable(playlist: &Playlist) -> Result<(), SelectionError> {
    if playlist.len() < MIN_PLAYLIST_TRACKS {
        return Err(SelectionError::TooSmall(playlist.len()));
    }
    let distinct: HashSet<&str> = playlist.tracks().iter().map(|track| track.id.as_str()).collect();
    if distinct.len() < MIN_PLAYLIST_TRACKS {
        return Err(SelectionError::NotEnoughDistinct);
    }
    Ok(())
}

/// Produce the current track entry plus [`DECOY_COUNT`] decoys sampled
/// uniformly from the playlist, all with pairwise distinct track ids.
pub fn select_tracks<R>(
    playlist: &Playlist,
    current: &Track,
    rng: &mut R,
) -> Result<Selections, SelectionError>
where
    R: Rng + ?Sized,
{
    if playlist.len() < MIN_PLAYLIST_TRACKS {
        return Err(SelectionError::TooSmall(playlist.len()));
    }

    let available = playlist
        .tracks()
        .iter()
        .map(|track| track.id.as_str())
        .filter(|id| *id != current.id)
        .collect::<HashSet<_>>()
        .len();
    if available < DECOY_COUNT {
        return Err(SelectionError::NotEnoughDistinct);
    }

    let mut seen: HashSet<&str> = HashSet::from([current.id.as_str()]);
    let mut selections = Selections::new(display(current));
    while selections.len() <= DECOY_COUNT {
        let Some(candidate) = playlist.tracks().choose(rng) else {
            return Err(SelectionError::TooSmall(0));
        };
        if seen.insert(candidate.id.as_str()) {
            selections.push_decoy(display(candidate));
        }
    }
    Ok(selections)
}

/// Display form of a track: featuring suffix removed, artists comma joined.
pub fn display(track: &Track) -> Selection {
    Selection {
        name: strip_featuring(&track.name).to_string(),
        artists: track.artists.join(", "),
    }
}

/// Cut the title at the first whitespace followed by a featuring marker.
fn strip_featuring(name: &str) -> &str {
    for (index, ch) in name.char_indices() {
        if !ch.is_whitespace() {
            continue;
        }
        let rest = &name[index + ch.len_utf8()..];
        let is_marker = FEATURING_MARKERS.iter().any(|marker| {
            rest.get(..marker.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(marker))
        });
        if is_marker {
            return &name[..index];
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn track(id: &str, name: &str) -> Track {
        Track {
            id: id.into(),
            name: name.into(),
            artists: vec!["Solo".into()],
        }
    }

    fn playlist(ids: &[&str]) -> Playlist {
        Playlist::new(
            "abc",
            ids.iter().map(|id| track(id, &format!("Song {id}"))).collect(),
        )
    }

    #[test]
    fn strips_featuring_suffixes() {
        assert_eq!(strip_featuring("Song (feat. Someone)"), "Song");
        assert_eq!(strip_featuring("Song (Feat. Someone) [Remix]"), "Song");
        assert_eq!(strip_featuring("Song (with Other)"), "Song");
        assert_eq!(strip_featuring("Song (WITH Other)"), "Song");
        assert_eq!(strip_featuring("Song (Live)"), "Song (Live)");
        assert_eq!(strip_featuring("Song(feat. Glued)"), "Song(feat. Glued)");
        assert_eq!(strip_featuring("Déjà vu (feat. X)"), "Déjà vu");
    }

    #[test]
    fn joins_artists_with_commas() {
        let selection = display(&Track {
            id: "1".into(),
            name: "Duet (with B)".into(),
            artists: vec!["A".into(), "B".into(), "C".into()],
        });
        assert_eq!(selection.name, "Duet");
        assert_eq!(selection.artists, "A, B, C");
    }

    #[test]
    fn four_distinct_tracks_every_time() {
        let playlist = playlist(&["a", "b", "c", "d", "e", "f"]);
        let current = track("c", "Song c (feat. Guest)");
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let selections = select_tracks(&playlist, &current, &mut rng).unwrap();
            assert_eq!(selections.len(), 4);
            assert_eq!(selections.current().name, "Song c");

            let names: HashSet<_> = selections.iter().map(|(_, s)| s.name.clone()).collect();
            assert_eq!(names.len(), 4);
        }
    }

    #[test]
    fn exactly_four_tracks_uses_the_other_three() {
        let playlist = playlist(&["a", "b", "c", "d"]);
        let current = track("b", "Song b");
        let mut rng = StdRng::seed_from_u64(42);

        let selections = select_tracks(&playlist, &current, &mut rng).unwrap();
        let mut decoys: Vec<_> = selections.decoys().map(|s| s.name.as_str()).collect();
        decoys.sort_unstable();
        assert_eq!(decoys, ["Song a", "Song c", "Song d"]);
    }

    #[test]
    fn current_track_may_be_outside_the_playlist() {
        let playlist = playlist(&["a", "b", "c", "d"]);
        let current = track("z", "Elsewhere");
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..50 {
            let selections = select_tracks(&playlist, &current, &mut rng).unwrap();
            assert_eq!(selections.current().name, "Elsewhere");
            let decoys: HashSet<_> = selections.decoys().map(|s| s.name.as_str()).collect();
            assert_eq!(decoys.len(), 3);
            assert!(!decoys.contains("Elsewhere"));
        }
    }

    #[test]
    fn three_track_playlist_is_too_small() {
        let playlist = playlist(&["a", "b", "c"]);
        let current = track("z", "Elsewhere");
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(
            select_tracks(&playlist, &current, &mut rng).unwrap_err(),
            SelectionError::TooSmall(3)
        );
    }

    #[test]
    fn duplicated_entries_do_not_loop_forever() {
        let playlist = playlist(&["a", "a", "b", "b", "c"]);
        let current = track("a", "Song a");
        let mut rng = StdRng::seed_from_u64(3);

        assert_eq!(
            select_tracks(&playlist, &current, &mut rng).unwrap_err(),
            SelectionError::NotEnoughDistinct
        );
    }

    #[test]
    fn playable_requires_four_distinct_tracks() {
        assert_eq!(
            ensure_playable(&playlist(&["a", "b", "c"])).unwrap_err(),
            SelectionError::TooSmall(3)
        );
        assert_eq!(
            ensure_playable(&playlist(&["a", "b", "c", "c"])).unwrap_err(),
            SelectionError::NotEnoughDistinct
        );
        assert!(ensure_playable(&playlist(&["a", "b", "c", "d"])).is_ok());
    }
}
