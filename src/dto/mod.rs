//! Wire-level data transfer objects.

/// Health check payloads.
pub mod health;
/// Spotify status endpoint payloads.
pub mod spotify;
/// WebSocket message envelopes.
pub mod ws;
