//! Application-level configuration loading: the delays of the round lifecycle.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRACK_QUIZ_CONFIG_PATH";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    timings: GameTimings,
}

/// Delays applied between the steps of a round.
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameTimings {
    /// How long the scoreboard stays up before the next round (or game over).
    #[serde(rename = "scoreboard_display_ms")]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub scoreboard_display: Duration,
    /// Delay between game over and the leader's play-again prompt.
    #[serde(rename = "replay_prompt_delay_ms")]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub replay_prompt_delay: Duration,
    /// Wait after a playback command before asking what is playing.
    #[serde(rename = "skip_settle_ms")]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub skip_settle: Duration,
}

impl Default for GameTimings {
    fn default() -> Self {
        Self {
            scoreboard_display: Duration::from_secs(10),
            replay_prompt_delay: Duration::from_secs(5),
            skip_settle: Duration::from_millis(500),
        }
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        timings = ?app_config.timings,
                        "loaded game timings from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse the JSON configuration document.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let raw: RawConfig = serde_json::from_str(contents)?;
        Ok(raw.into())
    }

    /// Delays of the round lifecycle.
    pub fn timings(&self) -> &GameTimings {
        &self.timings
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    timings: GameTimings,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            timings: value.timings,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_timings_keep_defaults() {
        let config = AppConfig::from_json(r#"{"timings": {"scoreboard_display_ms": 2500}}"#).unwrap();
        assert_eq!(
            *config.timings(),
            GameTimings {
                scoreboard_display: Duration::from_millis(2500),
                ..GameTimings::default()
            }
        );
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(AppConfig::from_json("{}").unwrap(), AppConfig::default());
    }

    #[test]
    fn rejects_non_numeric_delays() {
        assert!(AppConfig::from_json(r#"{"timings": {"skip_settle_ms": "soon"}}"#).is_err());
    }
}
