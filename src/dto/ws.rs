//! WebSocket message envelopes exchanged with game clients.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Messages accepted from game clients.
///
/// Unknown `type` values deserialize to [`ClientMessage::Unknown`] so new
/// client versions never break older servers.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Start a fresh game on the given genre's playback context.
    NewGame {
        /// Genre selected by the host.
        genre_name: String,
    },
    /// Change the selected genre without restarting playback.
    GenreChange {
        /// Newly selected genre.
        genre_name: String,
    },
    /// A player buzzes in; only the first claim per round counts.
    PlayerGuess {
        /// Display name of the guessing player.
        player_name: String,
    },
    /// Reveal the current track to everyone and resume playback.
    ShowAnswer,
    /// Advance to the next round and the next track.
    NextRound,
    /// Clear the guesser and resume the same track for another try.
    GuessAgain,
    /// Forward-compatible catch-all for unrecognized message types.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse an inbound text frame.
    pub fn from_json_str(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Messages broadcast to game clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Snapshot sent to a newly connected client before any replay.
    State {
        /// Whether any usable provider credential exists.
        spotify_connected: bool,
        /// Currently selected genre, if one was chosen.
        #[serde(skip_serializing_if = "Option::is_none")]
        genre_name: Option<String>,
    },
    /// The selected genre changed.
    GenreChange {
        /// Normalized genre value.
        genre_name: String,
    },
    /// A player claimed the guess for this round.
    FirstGuesser {
        /// Name of the credited player.
        player_name: String,
    },
    /// The answer reveal; fields are empty strings when the track is unknown.
    Answer {
        /// Track title.
        song_title: String,
        /// Artist names joined with `", "`.
        artists_text: String,
        /// URL of the album cover image.
        album_image_url: String,
    },
    /// The next round started.
    NextRound,
    /// The round restarts with the same track.
    GuessAgain,
}
