//! Provider capability interface for the external playback service.
//!
//! The game core only ever talks to Spotify through these traits so tests can
//! substitute fakes and the HTTP client stays swappable.

use futures::future::BoxFuture;
use serde::Deserialize;
use thiserror::Error;

/// Errors returned by provider calls.
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// The provider signalled overload and asked us to back off.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Suggested wait before the next call, from the `Retry-After` header.
        retry_after_secs: u64,
    },
    /// Non-success response from the API (missing scope, no active device, ...).
    #[error("spotify api error ({status}): {message}")]
    Api {
        /// HTTP status code of the failed response.
        status: u16,
        /// Response body, useful for diagnostics only.
        message: String,
    },
    /// Transport-level failure: connect error, timeout, malformed body.
    #[error("spotify request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Result alias for provider calls.
pub type ApiResult<T> = Result<T, SpotifyError>;

/// What the provider reports about the user's current playback.
///
/// Absent `actions.disallows` entries mean the action is allowed; an absent
/// device means volume control is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    /// Whether something is playing right now.
    pub is_playing: bool,
    /// Provider policy currently forbids pausing.
    pub pausing_disallowed: bool,
    /// Provider policy currently forbids resuming.
    pub resuming_disallowed: bool,
    /// The active device accepts volume commands.
    pub supports_volume: bool,
}

/// Display metadata of the currently playing track, as shown to players on reveal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    /// Track title.
    pub title: String,
    /// Artist names joined with `", "`.
    pub artists_text: String,
    /// URL of the first (largest) album image, empty when unavailable.
    pub album_image_url: String,
}

/// Player capability of the external provider.
///
/// Every method takes the bearer access token resolved by the credential
/// store; none of them retries internally.
pub trait PlayerApi: Send + Sync {
    /// Fetch the current playback snapshot, `None` when no session is active.
    fn current_playback(&self, token: &str)
    -> BoxFuture<'static, ApiResult<Option<PlaybackSnapshot>>>;
    /// Fetch the currently playing track, `None` when nothing is playing.
    fn currently_playing(&self, token: &str) -> BoxFuture<'static, ApiResult<Option<TrackInfo>>>;
    /// Pause playback on the active device.
    fn pause(&self, token: &str) -> BoxFuture<'static, ApiResult<()>>;
    /// Resume playback where it left off.
    fn resume(&self, token: &str) -> BoxFuture<'static, ApiResult<()>>;
    /// Start playback of a provider context (playlist, album).
    fn play_context(&self, token: &str, context_uri: &str) -> BoxFuture<'static, ApiResult<()>>;
    /// Start playback of a single track.
    fn play_track(&self, token: &str, track_uri: &str) -> BoxFuture<'static, ApiResult<()>>;
    /// Set the volume of the active device.
    fn set_volume(&self, token: &str, percent: u8) -> BoxFuture<'static, ApiResult<()>>;
    /// Skip to the next track in the current context.
    fn skip_to_next(&self, token: &str) -> BoxFuture<'static, ApiResult<()>>;
    /// Toggle shuffle mode for the current context.
    fn set_shuffle(&self, token: &str, enabled: bool) -> BoxFuture<'static, ApiResult<()>>;
    /// Search for a track and return its URI, `None` when nothing matches.
    fn search_track(&self, token: &str, query: &str)
    -> BoxFuture<'static, ApiResult<Option<String>>>;
}

/// Token payload returned by the account service on exchange and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Fresh access token.
    pub access_token: String,
    /// New refresh token; the provider may omit it on refresh, in which case
    /// the previous one stays valid.
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Credential issuance capability: authorization-code exchange and refresh.
pub trait AuthApi: Send + Sync {
    /// Exchange an authorization code for a token pair.
    fn exchange_code(&self, code: &str) -> BoxFuture<'static, ApiResult<TokenResponse>>;
    /// Obtain a fresh access token from a refresh token.
    fn refresh_token(&self, refresh_token: &str) -> BoxFuture<'static, ApiResult<TokenResponse>>;
}
