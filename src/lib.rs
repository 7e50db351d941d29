//! Backend for a multiplayer guess-the-song party game: a WebSocket game
//! coordinator backed by Spotify playback control.

/// Runtime configuration loading.
pub mod config;
/// Wire-level data transfer objects.
pub mod dto;
/// HTTP error taxonomy.
pub mod error;
/// HTTP and WebSocket route trees.
pub mod routes;
/// Service layer behind the routes.
pub mod services;
/// Song catalog and playlist rotation.
pub mod songs;
/// Spotify credentials, rate limiting, and playback control.
pub mod spotify;
/// Shared application state and the game state machine.
pub mod state;
