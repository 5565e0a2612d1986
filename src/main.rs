//! Track Quiz Back binary entrypoint wiring the Spotify catalog, the game session and the HTTP layers.

use std::{env, future::IntoFuture, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use track_quiz_back::{
    catalog::spotify::{SpotifyCatalog, SpotifyConfig, run_token_refresher},
    config::AppConfig,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let spotify_config = SpotifyConfig::from_env().context("reading Spotify credentials")?;
    let catalog = SpotifyCatalog::connect(spotify_config)
        .await
        .context("authorizing against Spotify")?;
    let tokens = catalog.tokens();

    let app_state = AppState::new(config, Arc::new(catalog));
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let server = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    // Without an access token the catalog is unusable, so a refresher that
    // gives up takes the whole process down.
    tokio::select! {
        result = server => result.context("serving axum")?,
        err = run_token_refresher(tokens) => {
            return Err(anyhow::Error::new(err).context("refreshing the Spotify access token"));
        }
    }

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let Ok(mut term) = signal(SignalKind::terminate()) else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
