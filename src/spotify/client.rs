//! `reqwest`-backed implementation of the Spotify Web API capabilities.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, Response, StatusCode, Url, header};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::SpotifyConfig;

use super::api::{ApiResult, AuthApi, PlaybackSnapshot, PlayerApi, SpotifyError, TokenResponse};

const API_BASE: &str = "https://api.spotify.com/v1";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the Spotify player and account services.
pub struct SpotifyClient {
    http: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: String,
}

impl SpotifyClient {
    /// Build a client from the application configuration.
    pub fn new(config: &SpotifyConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
        })
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> ApiResult<TokenResponse> {
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json::<TokenResponse>().await?)
    }
}

/// Authorization URL the browser is redirected to when starting a login.
pub fn authorize_url(config: &SpotifyConfig, state: Uuid) -> String {
    let state = state.to_string();
    let params = [
        ("response_type", "code"),
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("scope", config.scopes.as_str()),
        ("state", state.as_str()),
    ];
    // The base URL is a constant, parsing cannot fail.
    Url::parse_with_params(AUTHORIZE_URL, params)
        .map(String::from)
        .unwrap_or_else(|_| AUTHORIZE_URL.to_owned())
}

/// Map overload and error responses to the distinguished error variants.
async fn check(response: Response) -> ApiResult<Response> {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or(1);
        return Err(SpotifyError::RateLimited { retry_after_secs });
    }
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        return Err(SpotifyError::Api { status, message });
    }
    Ok(response)
}

/// Issue a player command that returns no body.
async fn command(request: reqwest::RequestBuilder) -> ApiResult<()> {
    let response = request.send().await?;
    check(response).await?;
    Ok(())
}

impl PlayerApi for SpotifyClient {
    fn current_playback(
        &self,
        token: &str,
    ) -> BoxFuture<'static, ApiResult<Option<PlaybackSnapshot>>> {
        let http = self.http.clone();
        let token = token.to_owned();
        Box::pin(async move {
            let response = http
                .get(format!("{API_BASE}/me/player"))
                .bearer_auth(token)
                .send()
                .await?;
            if response.status() == StatusCode::NO_CONTENT {
                return Ok(None);
            }
            let response = check(response).await?;
            let raw = response.json::<RawPlayback>().await?;
            Ok(Some(raw.into()))
        })
    }

    fn currently_playing(
        &self,
        token: &str,
    ) -> BoxFuture<'static, ApiResult<Option<super::api::TrackInfo>>> {
        let http = self.http.clone();
        let token = token.to_owned();
        Box::pin(async move {
            let response = http
                .get(format!("{API_BASE}/me/player/currently-playing"))
                .bearer_auth(token)
                .send()
                .await?;
            if response.status() == StatusCode::NO_CONTENT {
                return Ok(None);
            }
            let response = check(response).await?;
            let raw = response.json::<RawCurrentlyPlaying>().await?;
            Ok(raw.item.map(Into::into))
        })
    }

    fn pause(&self, token: &str) -> BoxFuture<'static, ApiResult<()>> {
        let request = self
            .http
            .put(format!("{API_BASE}/me/player/pause"))
            .bearer_auth(token);
        Box::pin(command(request))
    }

    fn resume(&self, token: &str) -> BoxFuture<'static, ApiResult<()>> {
        let request = self
            .http
            .put(format!("{API_BASE}/me/player/play"))
            .bearer_auth(token);
        Box::pin(command(request))
    }

    fn play_context(&self, token: &str, context_uri: &str) -> BoxFuture<'static, ApiResult<()>> {
        let request = self
            .http
            .put(format!("{API_BASE}/me/player/play"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "context_uri": context_uri }));
        Box::pin(command(request))
    }

    fn play_track(&self, token: &str, track_uri: &str) -> BoxFuture<'static, ApiResult<()>> {
        let request = self
            .http
            .put(format!("{API_BASE}/me/player/play"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "uris": [track_uri] }));
        Box::pin(command(request))
    }

    fn set_volume(&self, token: &str, percent: u8) -> BoxFuture<'static, ApiResult<()>> {
        let request = self
            .http
            .put(format!("{API_BASE}/me/player/volume"))
            .query(&[("volume_percent", u32::from(percent))])
            .bearer_auth(token);
        Box::pin(command(request))
    }

    fn skip_to_next(&self, token: &str) -> BoxFuture<'static, ApiResult<()>> {
        let request = self
            .http
            .post(format!("{API_BASE}/me/player/next"))
            .bearer_auth(token);
        Box::pin(command(request))
    }

    fn set_shuffle(&self, token: &str, enabled: bool) -> BoxFuture<'static, ApiResult<()>> {
        let request = self
            .http
            .put(format!("{API_BASE}/me/player/shuffle"))
            .query(&[("state", enabled)])
            .bearer_auth(token);
        Box::pin(command(request))
    }

    fn search_track(
        &self,
        token: &str,
        query: &str,
    ) -> BoxFuture<'static, ApiResult<Option<String>>> {
        let http = self.http.clone();
        let token = token.to_owned();
        let query = query.to_owned();
        Box::pin(async move {
            let response = http
                .get(format!("{API_BASE}/search"))
                .query(&[("q", query.as_str()), ("type", "track"), ("limit", "1")])
                .bearer_auth(token)
                .send()
                .await?;
            let response = check(response).await?;
            let raw = response.json::<RawSearch>().await?;
            Ok(raw
                .tracks
                .and_then(|tracks| tracks.items.into_iter().next())
                .map(|track| track.uri))
        })
    }
}

impl AuthApi for SpotifyClient {
    fn exchange_code(&self, code: &str) -> BoxFuture<'static, ApiResult<TokenResponse>> {
        let client = self.clone_for_auth();
        let code = code.to_owned();
        Box::pin(async move {
            client
                .token_request(&[
                    ("grant_type", "authorization_code"),
                    ("code", code.as_str()),
                    ("redirect_uri", client.redirect_uri.as_str()),
                ])
                .await
        })
    }

    fn refresh_token(&self, refresh_token: &str) -> BoxFuture<'static, ApiResult<TokenResponse>> {
        let client = self.clone_for_auth();
        let refresh_token = refresh_token.to_owned();
        Box::pin(async move {
            client
                .token_request(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.as_str()),
                ])
                .await
        })
    }
}

impl SpotifyClient {
    fn clone_for_auth(&self) -> SpotifyClient {
        SpotifyClient {
            http: self.http.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            scopes: self.scopes.clone(),
        }
    }
}

// Wire shapes, reduced to the fields the game cares about.

#[derive(Debug, Deserialize)]
struct RawPlayback {
    #[serde(default)]
    is_playing: bool,
    actions: Option<RawActions>,
    device: Option<RawDevice>,
}

#[derive(Debug, Deserialize)]
struct RawActions {
    disallows: Option<RawDisallows>,
}

#[derive(Debug, Deserialize)]
struct RawDisallows {
    #[serde(default)]
    pausing: bool,
    #[serde(default)]
    resuming: bool,
}

#[derive(Debug, Deserialize)]
struct RawDevice {
    #[serde(default)]
    supports_volume: bool,
}

impl From<RawPlayback> for PlaybackSnapshot {
    fn from(raw: RawPlayback) -> Self {
        let disallows = raw.actions.and_then(|actions| actions.disallows);
        Self {
            is_playing: raw.is_playing,
            pausing_disallowed: disallows.as_ref().is_some_and(|d| d.pausing),
            resuming_disallowed: disallows.as_ref().is_some_and(|d| d.resuming),
            supports_volume: raw.device.is_some_and(|device| device.supports_volume),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCurrentlyPlaying {
    item: Option<RawTrack>,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    #[serde(default)]
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    artists: Vec<RawArtist>,
    album: Option<RawAlbum>,
}

#[derive(Debug, Deserialize)]
struct RawArtist {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawAlbum {
    #[serde(default)]
    images: Vec<RawImage>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawSearch {
    tracks: Option<RawSearchTracks>,
}

#[derive(Debug, Deserialize)]
struct RawSearchTracks {
    #[serde(default)]
    items: Vec<RawTrack>,
}

impl From<RawTrack> for super::api::TrackInfo {
    fn from(raw: RawTrack) -> Self {
        let artists_text = raw
            .artists
            .into_iter()
            .map(|artist| artist.name)
            .filter(|name| !name.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let album_image_url = raw
            .album
            .and_then(|album| album.images.into_iter().next())
            .map(|image| image.url)
            .unwrap_or_default();
        Self {
            title: raw.name,
            artists_text,
            album_image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spotify::api::TrackInfo;

    #[test]
    fn authorize_url_carries_all_oauth_parameters() {
        let config = SpotifyConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost:8080/spotify/callback".into(),
            scopes: "user-read-playback-state".into(),
            global_refresh_token: None,
        };
        let state = Uuid::new_v4();
        let url = authorize_url(&config, state);
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=id"));
        assert!(url.contains(&format!("state={state}")));
    }

    #[test]
    fn playback_snapshot_defaults_when_fields_absent() {
        let raw: RawPlayback = serde_json::from_str(r#"{"is_playing": true}"#).unwrap();
        let snapshot = PlaybackSnapshot::from(raw);
        assert!(snapshot.is_playing);
        assert!(!snapshot.pausing_disallowed);
        assert!(!snapshot.resuming_disallowed);
        assert!(!snapshot.supports_volume);
    }

    #[test]
    fn playback_snapshot_reads_disallows_and_device() {
        let raw: RawPlayback = serde_json::from_str(
            r#"{
                "is_playing": false,
                "actions": {"disallows": {"resuming": true}},
                "device": {"supports_volume": true}
            }"#,
        )
        .unwrap();
        let snapshot = PlaybackSnapshot::from(raw);
        assert!(!snapshot.is_playing);
        assert!(snapshot.resuming_disallowed);
        assert!(!snapshot.pausing_disallowed);
        assert!(snapshot.supports_volume);
    }

    #[test]
    fn track_info_joins_artists_and_picks_first_image() {
        let raw: RawTrack = serde_json::from_str(
            r#"{
                "name": "Song",
                "uri": "spotify:track:123",
                "artists": [{"name": "A"}, {"name": ""}, {"name": "B"}],
                "album": {"images": [{"url": "https://img/1"}, {"url": "https://img/2"}]}
            }"#,
        )
        .unwrap();
        let info = TrackInfo::from(raw);
        assert_eq!(info.title, "Song");
        assert_eq!(info.artists_text, "A, B");
        assert_eq!(info.album_image_url, "https://img/1");
    }
}
