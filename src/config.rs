//! Application configuration: Spotify credentials, volumes, and genre contexts.

use std::{collections::HashMap, env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::songs::normalize_genre;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GUESS_THE_SONG_CONFIG_PATH";
/// Default catalog file location.
const DEFAULT_CATALOG_PATH: &str = "config/catalog.json";
/// Scopes required for reading and driving playback.
const DEFAULT_SCOPES: &str = "user-read-playback-state user-modify-playback-state";
/// Volume used while the answer is shown.
const DEFAULT_REVEAL_VOLUME: u8 = 75;
/// Volume used during normal rounds.
const DEFAULT_PLAY_VOLUME: u8 = 100;

/// Spotify application credentials and OAuth settings.
#[derive(Debug, Clone, Default)]
pub struct SpotifyConfig {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Redirect URI registered for the authorization-code flow.
    pub redirect_uri: String,
    /// Space-separated scope list requested on login.
    pub scopes: String,
    /// Long-lived refresh token seeding the global credential, if configured.
    pub global_refresh_token: Option<String>,
}

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Spotify integration settings.
    pub spotify: SpotifyConfig,
    /// Volume while the answer is shown.
    pub reveal_volume: u8,
    /// Volume during normal rounds.
    pub play_volume: u8,
    /// Normalized genre key to provider playback-context URI.
    pub genre_contexts: HashMap<String, String>,
    /// Location of the song catalog file.
    pub catalog_path: PathBuf,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to defaults with a
    /// logged warning. Secrets can always be overridden via environment.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration");
                    raw.into()
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
        };

        apply_env_overrides(&mut config.spotify);
        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            spotify: SpotifyConfig {
                scopes: DEFAULT_SCOPES.to_owned(),
                redirect_uri: "http://localhost:8080/spotify/callback".to_owned(),
                ..SpotifyConfig::default()
            },
            reveal_volume: DEFAULT_REVEAL_VOLUME,
            play_volume: DEFAULT_PLAY_VOLUME,
            genre_contexts: HashMap::new(),
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
        }
    }
}

/// JSON representation of the configuration file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    spotify: RawSpotify,
    #[serde(default)]
    reveal_volume: Option<u8>,
    #[serde(default)]
    play_volume: Option<u8>,
    /// Genre label to playback-context URI; keys are normalized on load.
    #[serde(default)]
    genre_contexts: HashMap<String, String>,
    #[serde(default)]
    catalog_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpotify {
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    client_secret: String,
    #[serde(default)]
    redirect_uri: Option<String>,
    #[serde(default)]
    scopes: Option<String>,
    #[serde(default)]
    global_refresh_token: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            spotify: SpotifyConfig {
                client_id: raw.spotify.client_id,
                client_secret: raw.spotify.client_secret,
                redirect_uri: raw
                    .spotify
                    .redirect_uri
                    .unwrap_or(defaults.spotify.redirect_uri),
                scopes: raw.spotify.scopes.unwrap_or(defaults.spotify.scopes),
                global_refresh_token: raw
                    .spotify
                    .global_refresh_token
                    .filter(|token| !token.trim().is_empty()),
            },
            reveal_volume: raw.reveal_volume.unwrap_or(defaults.reveal_volume),
            play_volume: raw.play_volume.unwrap_or(defaults.play_volume),
            genre_contexts: raw
                .genre_contexts
                .into_iter()
                .map(|(genre, uri)| (normalize_genre(&genre), uri))
                .collect(),
            catalog_path: raw.catalog_path.unwrap_or(defaults.catalog_path),
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

/// Secrets may come from the environment instead of (or overriding) the file.
fn apply_env_overrides(spotify: &mut SpotifyConfig) {
    if let Ok(value) = env::var("SPOTIFY_CLIENT_ID")
        && !value.is_empty()
    {
        spotify.client_id = value;
    }
    if let Ok(value) = env::var("SPOTIFY_CLIENT_SECRET")
        && !value.is_empty()
    {
        spotify.client_secret = value;
    }
    if let Ok(value) = env::var("SPOTIFY_GLOBAL_REFRESH_TOKEN")
        && !value.trim().is_empty()
    {
        spotify.global_refresh_token = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_context_keys_are_normalized_on_load() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "spotify": {"clientId": "id", "clientSecret": "secret"},
                "genreContexts": {" Hip  Hop ": "spotify:playlist:abc"}
            }"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(
            config.genre_contexts.get("hip hop").map(String::as_str),
            Some("spotify:playlist:abc")
        );
    }

    #[test]
    fn blank_global_refresh_token_counts_as_absent() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"spotify": {"globalRefreshToken": "  "}}"#).unwrap();
        let config = AppConfig::from(raw);
        assert!(config.spotify.global_refresh_token.is_none());
    }

    #[test]
    fn defaults_cover_volumes_and_paths() {
        let config = AppConfig::default();
        assert_eq!(config.reveal_volume, 75);
        assert_eq!(config.play_volume, 100);
        assert_eq!(config.catalog_path, PathBuf::from("config/catalog.json"));
    }
}
