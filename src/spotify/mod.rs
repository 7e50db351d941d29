//! Spotify integration: credentials, rate limiting, and playback control.

/// Provider capability traits and error taxonomy.
pub mod api;
/// `reqwest` implementation of the provider capabilities.
pub mod client;
/// Playback controller translating game intents into provider calls.
pub mod playback;
/// Cooldown window for provider overload signals.
pub mod rate_limit;
/// Access/refresh token pairs and the credential store.
pub mod token;

pub use api::{AuthApi, PlayerApi, SpotifyError, TrackInfo};
pub use client::{SpotifyClient, authorize_url};
pub use playback::{CurrentTrack, PlaybackIntent, PlaybackService};
pub use rate_limit::RateLimitGate;
pub use token::{SessionToken, TokenError, TokenStore};
