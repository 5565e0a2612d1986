//! Spotify Web API implementation of [`CatalogClient`](crate::catalog::CatalogClient).

mod client;
mod config;
mod error;
mod models;
mod token;

pub use client::SpotifyCatalog;
pub use config::SpotifyConfig;
pub use error::{SpotifyError, SpotifyResult};
pub use token::{TokenSource, run_token_refresher};
