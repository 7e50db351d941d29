//! Static song catalog loaded from disk at startup.

use std::{fs, path::Path};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One candidate song inside a catalog category.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SongItem {
    /// Display title.
    pub title: String,
    /// Performing artists, in display order.
    #[serde(default)]
    pub artists: Vec<String>,
    /// Curated provider track URI; skips the search step when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spotify_uri: Option<String>,
    /// Curated search query overriding the generated `title - artists` one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spotify_query: Option<String>,
}

impl SongItem {
    /// Artist names joined with `", "`, skipping blank entries.
    pub fn artists_text(&self) -> String {
        self.artists
            .iter()
            .map(|artist| artist.trim())
            .filter(|artist| !artist.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Provider search query for this song.
    pub fn search_query(&self) -> String {
        if let Some(query) = &self.spotify_query
            && !query.trim().is_empty()
        {
            return query.trim().to_owned();
        }
        let artists = self.artists_text();
        if artists.is_empty() {
            self.title.trim().to_owned()
        } else {
            format!("{} - {artists}", self.title.trim())
        }
    }
}

/// A genre bucket of the catalog.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SongCategory {
    /// Stable identifier, optional in hand-written catalogs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Genre label shown to players; matched case-insensitively.
    pub label: String,
    /// Songs in this category.
    #[serde(default)]
    pub songs: Vec<SongItem>,
}

/// The whole catalog file.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct SongCatalog {
    /// Catalog format version.
    #[serde(default)]
    pub version: u32,
    /// Ordered genre categories; file order is preserved for the frontend.
    #[serde(default)]
    pub categories: Vec<SongCategory>,
}

impl SongCatalog {
    /// Catalog with no categories; the game still runs, rotation yields nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load and parse the catalog file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Songs for a genre, compared on the normalized label. Empty for unknown genres.
    pub fn songs_for_genre(&self, genre: &str) -> Vec<SongItem> {
        let needle = normalize_genre(genre);
        self.categories
            .iter()
            .find(|category| normalize_genre(&category.label) == needle)
            .map(|category| category.songs.clone())
            .unwrap_or_default()
    }

    /// All songs grouped by display label, preserving file order.
    pub fn by_label(&self) -> IndexMap<String, Vec<SongItem>> {
        self.categories
            .iter()
            .map(|category| (category.label.trim().to_owned(), category.songs.clone()))
            .collect()
    }
}

/// Canonical form of a genre key: trimmed, inner whitespace collapsed, lowercased.
pub fn normalize_genre(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SongCatalog {
        serde_json::from_str(
            r#"{
                "version": 1,
                "categories": [
                    {"id": "rock", "label": "Rock", "songs": [
                        {"title": "Song A", "artists": ["Artist 1"]},
                        {"title": "Song B", "artists": ["Artist 2", "Artist 3"]}
                    ]},
                    {"label": "Pop", "songs": []}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn genre_normalization_collapses_case_and_whitespace() {
        assert_eq!(normalize_genre("Rock"), "rock");
        assert_eq!(normalize_genre("  rock "), "rock");
        assert_eq!(normalize_genre("Hip  Hop"), "hip hop");
    }

    #[test]
    fn lookup_matches_label_case_insensitively() {
        let catalog = catalog();
        assert_eq!(catalog.songs_for_genre(" ROCK ").len(), 2);
        assert!(catalog.songs_for_genre("jazz").is_empty());
    }

    #[test]
    fn search_query_prefers_curated_query() {
        let song = SongItem {
            title: "Song A".into(),
            artists: vec!["Artist 1".into()],
            spotify_uri: None,
            spotify_query: Some("custom query".into()),
        };
        assert_eq!(song.search_query(), "custom query");
    }

    #[test]
    fn search_query_joins_title_and_artists() {
        let song = SongItem {
            title: "Song B".into(),
            artists: vec!["Artist 2".into(), "".into(), "Artist 3".into()],
            spotify_uri: None,
            spotify_query: None,
        };
        assert_eq!(song.search_query(), "Song B - Artist 2, Artist 3");
    }

    #[test]
    fn grouped_listing_preserves_file_order() {
        let labels: Vec<_> = catalog().by_label().into_keys().collect();
        assert_eq!(labels, vec!["Rock".to_owned(), "Pop".to_owned()]);
    }
}
