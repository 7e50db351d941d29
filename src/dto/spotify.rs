//! REST payloads for the Spotify status and diagnostics endpoints.

use serde::Serialize;
use utoipa::ToSchema;

use crate::spotify::TrackInfo;

/// Authentication status of the Spotify integration.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpotifyStatus {
    /// Whether the queried identity has a session credential.
    pub authenticated: bool,
    /// Whether the shared global credential is present.
    pub global_authenticated: bool,
}

/// Returned by `/spotify/current` when no track is playing.
#[derive(Debug, Serialize, ToSchema)]
pub struct NotPlaying {
    /// Always `false`.
    pub playing: bool,
}

impl NotPlaying {
    /// The canonical "nothing playing" payload.
    pub fn new() -> Self {
        Self { playing: false }
    }
}

impl Default for NotPlaying {
    fn default() -> Self {
        Self::new()
    }
}

/// Returned by `/spotify/current` while a track is playing.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    /// Always `true`.
    pub playing: bool,
    /// Track title.
    pub song_title: String,
    /// Artist names joined with `", "`.
    pub artists_text: String,
    /// URL of the album cover image.
    pub album_image_url: String,
}

impl From<TrackInfo> for NowPlaying {
    fn from(track: TrackInfo) -> Self {
        Self {
            playing: true,
            song_title: track.title,
            artists_text: track.artists_text,
            album_image_url: track.album_image_url,
        }
    }
}
