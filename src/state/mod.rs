pub mod game;
pub mod leader;
pub mod registry;
pub mod round;
pub mod session;
pub mod state_machine;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{catalog::CatalogClient, config::AppConfig, state::session::GameSession};

/// Handle to the application state shared by every task.
pub type SharedState = Arc<AppState>;

/// Central application state: the game session, the music catalog and the configuration.
pub struct AppState {
    session: Mutex<GameSession>,
    catalog: Arc<dyn CatalogClient>,
    config: Arc<AppConfig>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, catalog: Arc<dyn CatalogClient>) -> SharedState {
        Arc::new(Self {
            session: Mutex::new(GameSession::new()),
            catalog,
            config: Arc::new(config),
        })
    }

    /// Run `f` with exclusive access to the session. `f` is synchronous, so the
    /// lock is never held across a catalog call.
    pub async fn with_session<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut GameSession) -> T,
    {
        let mut guard = self.session.lock().await;
        f(&mut guard)
    }

    /// Handle to the music catalog, to be called with the session unlocked.
    pub fn catalog(&self) -> Arc<dyn CatalogClient> {
        self.catalog.clone()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
