//! Non-repeating shuffled rotation through a genre's catalog songs.

use rand::seq::SliceRandom;

use super::catalog::{SongCatalog, SongItem, normalize_genre};

/// Cursor over a shuffled sequence of one genre's songs.
///
/// Every song is returned exactly once per cycle; reaching the end reshuffles
/// and starts a new cycle, so only the boundary between cycles can repeat a
/// song back to back.
#[derive(Debug, Default)]
pub struct SongRotation {
    genre: Option<String>,
    playlist: Vec<SongItem>,
    next_index: usize,
}

impl SongRotation {
    /// Empty rotation; the first `next` call builds the playlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next candidate for `genre`, or `None` when the catalog has
    /// no songs for it. Switching genre (or exhausting the cycle) reshuffles.
    pub fn next(&mut self, genre: &str, catalog: &SongCatalog) -> Option<SongItem> {
        let genre = normalize_genre(genre);
        if self.genre.as_deref() != Some(genre.as_str()) {
            self.reset(&genre, catalog);
        }

        if self.playlist.is_empty() {
            return None;
        }

        if self.next_index >= self.playlist.len() {
            self.playlist.shuffle(&mut rand::rng());
            self.next_index = 0;
        }

        let song = self.playlist[self.next_index].clone();
        self.next_index += 1;
        Some(song)
    }

    /// Rebuild the shuffled playlist for `genre` and rewind to the start.
    pub fn reset(&mut self, genre: &str, catalog: &SongCatalog) {
        let genre = normalize_genre(genre);
        self.playlist = catalog.songs_for_genre(&genre);
        self.playlist.shuffle(&mut rand::rng());
        self.genre = Some(genre);
        self.next_index = 0;
    }
}
