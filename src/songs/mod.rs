//! Song catalog loading and per-genre rotation.

/// Catalog file model and genre lookup.
pub mod catalog;
/// Shuffled non-repeating rotation cursor.
pub mod rotation;

pub use catalog::{SongCatalog, SongItem, normalize_genre};
pub use rotation::SongRotation;
