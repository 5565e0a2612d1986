//! Shared fixtures: an in-memory catalog and participant handles.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use futures::future::BoxFuture;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use track_quiz_back::{
    catalog::{CatalogClient, CatalogError, CatalogResult, PlaylistSummary},
    config::AppConfig,
    dto::ws::OutboundMessage,
    services::session_service,
    state::{
        AppState, SharedState,
        game::{Selection, Selections, Track},
        registry::ParticipantId,
        state_machine::ParticipantState,
    },
};

/// Catalog serving fixed playlists; playback is a cursor over the playing playlist.
pub struct ScriptedCatalog {
    playlists: HashMap<String, Vec<Track>>,
    playing: Mutex<Option<String>>,
    position: AtomicUsize,
    failing: AtomicBool,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedCatalog {
    /// `abc` has six tracks, `small` only three.
    pub fn new() -> Arc<Self> {
        let playlists = HashMap::from([
            ("abc".to_string(), tracks(6)),
            ("small".to_string(), tracks(3)),
        ]);
        Arc::new(Self {
            playlists,
            playing: Mutex::new(None),
            position: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Make every later playback read fail as if the service were down.
    pub fn fail_from_now_on(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Number of times an operation was invoked.
    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    fn record(&self, operation: &'static str) {
        self.calls.lock().unwrap().push(operation);
    }

    fn outage() -> CatalogError {
        CatalogError::unavailable("scripted outage", std::io::Error::other("service down"))
    }
}

impl CatalogClient for ScriptedCatalog {
    fn fetch_playlists(&self) -> BoxFuture<'static, CatalogResult<Vec<PlaylistSummary>>> {
        self.record("fetch_playlists");
        let mut playlists: Vec<_> = self
            .playlists
            .keys()
            .map(|id| PlaylistSummary {
                name: format!("Playlist {id}"),
                playlist_id: id.clone(),
            })
            .collect();
        playlists.sort_by(|a, b| a.playlist_id.cmp(&b.playlist_id));
        Box::pin(async move { Ok(playlists) })
    }

    fn load_playlist(&self, playlist_id: &str) -> BoxFuture<'static, CatalogResult<Vec<Track>>> {
        self.record("load_playlist");
        let result = self
            .playlists
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(playlist_id.to_string()));
        Box::pin(async move { result })
    }

    fn start_playback(&self, playlist_id: &str) -> BoxFuture<'static, CatalogResult<()>> {
        self.record("start_playback");
        *self.playing.lock().unwrap() = Some(playlist_id.to_string());
        self.position.store(0, Ordering::SeqCst);
        Box::pin(async move { Ok(()) })
    }

    fn current_track(&self) -> BoxFuture<'static, CatalogResult<Track>> {
        self.record("current_track");
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(Self::outage())
        } else {
            let playing = self.playing.lock().unwrap().clone();
            playing
                .and_then(|id| self.playlists.get(&id))
                .map(|tracks| tracks[self.position.load(Ordering::SeqCst) % tracks.len()].clone())
                .ok_or(CatalogError::NothingPlaying)
        };
        Box::pin(async move { result })
    }

    fn skip_next(&self) -> BoxFuture<'static, CatalogResult<()>> {
        self.record("skip_next");
        self.position.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(()) })
    }
}

fn tracks(count: usize) -> Vec<Track> {
    (1..=count)
        .map(|n| Track {
            id: format!("t{n}"),
            name: format!("Song {n} (feat. Guest)"),
            artists: vec![format!("Artist {n}"), "Band".to_string()],
        })
        .collect()
}

/// Application state backed by `catalog` and the default timings.
pub fn app(catalog: &Arc<ScriptedCatalog>) -> SharedState {
    AppState::new(AppConfig::default(), catalog.clone())
}

/// One connected participant and the frames pushed to it.
pub struct Client {
    pub id: ParticipantId,
    rx: UnboundedReceiver<OutboundMessage>,
}

impl Client {
    pub async fn connect(state: &SharedState) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = session_service::connect(state, tx).await;
        Self { id, rx }
    }

    pub async fn send(&self, state: &SharedState, text: &str) {
        session_service::handle_text(state, self.id, text).await;
    }

    pub async fn answer(&self, state: &SharedState, selection: &Selection) {
        let text = serde_json::to_string(selection).unwrap();
        self.send(state, &text).await;
    }

    /// Every frame received since the last call.
    pub fn frames(&mut self) -> Vec<OutboundMessage> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

/// Last answer set found in `frames`.
pub fn selections_in(frames: &[OutboundMessage]) -> Selections {
    frames
        .iter()
        .rev()
        .find_map(|frame| match frame {
            OutboundMessage::Selections(selections) => Some(selections.clone()),
            _ => None,
        })
        .expect("no selections received")
}

/// A decoy of the answer set, always wrong.
pub fn wrong_answer(selections: &Selections) -> Selection {
    selections.decoys().next().cloned().expect("answer set has decoys")
}

pub fn state(code: ParticipantState) -> OutboundMessage {
    OutboundMessage::State(code)
}

pub const SETUP_TWO_ROUNDS: &str = r#"{"max rounds": 2, "playlist ID": "abc"}"#;
pub const SETUP_ONE_ROUND: &str = r#"{"max rounds": 1, "playlist ID": "abc"}"#;
