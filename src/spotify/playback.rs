//! Translates game intents into best-effort calls against the playback provider.
//!
//! Nothing in here ever propagates an error to the game loop: a broken or
//! rate-limited provider degrades playback, never the game itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::songs::{SongCatalog, SongItem, SongRotation};

use super::api::{ApiResult, PlaybackSnapshot, PlayerApi, SpotifyError, TrackInfo};
use super::rate_limit::RateLimitGate;
use super::token::{TokenError, TokenStore};

/// How long a successful track search result stays cached.
const SEARCH_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// How long a miss stays cached before the search is retried.
const SEARCH_MISS_TTL: Duration = Duration::from_secs(5 * 60);

/// Playback action requested by a game state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackIntent {
    /// A guesser buzzed in: pause so the group can listen to the answer.
    PauseForGuess,
    /// The answer was revealed: resume at the reveal volume.
    RevealAndResume,
    /// Move on to the next track of the selected genre.
    AdvanceTrack {
        /// Currently selected genre, if any.
        genre: Option<String>,
    },
    /// Resume the current track unchanged for another guess.
    Restart,
    /// Start a fresh game on the genre's configured playback context.
    StartGenre {
        /// Normalized genre key.
        genre: String,
    },
}

/// Result of a direct currently-playing query (REST diagnostics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentTrack {
    /// No credential resolves, globally or from any connected identity.
    NotAuthenticated,
    /// A credential exists but nothing is playing (or the provider is unreachable).
    NothingPlaying,
    /// The track currently playing.
    Playing(TrackInfo),
}

/// Drives the external playback provider on behalf of the game.
pub struct PlaybackService {
    player: Arc<dyn PlayerApi>,
    tokens: Arc<TokenStore>,
    gate: Arc<RateLimitGate>,
    catalog: Arc<SongCatalog>,
    rotation: Mutex<SongRotation>,
    search_cache: DashMap<String, CachedUri>,
    genre_contexts: HashMap<String, String>,
    reveal_volume: u8,
    play_volume: u8,
}

#[derive(Debug, Clone)]
struct CachedUri {
    uri: Option<String>,
    expires_at: Instant,
}

impl PlaybackService {
    /// Wire the service to its collaborators.
    pub fn new(
        player: Arc<dyn PlayerApi>,
        tokens: Arc<TokenStore>,
        gate: Arc<RateLimitGate>,
        catalog: Arc<SongCatalog>,
        genre_contexts: HashMap<String, String>,
        reveal_volume: u8,
        play_volume: u8,
    ) -> Self {
        Self {
            player,
            tokens,
            gate,
            catalog,
            rotation: Mutex::new(SongRotation::new()),
            search_cache: DashMap::new(),
            genre_contexts,
            reveal_volume,
            play_volume,
        }
    }

    /// Execute one playback intent. Never fails: every provider problem is
    /// logged and the intent is abandoned where it stands.
    pub async fn run(&self, intent: PlaybackIntent, identities: &[Uuid]) {
        let Some(token) = self.access_token(identities).await else {
            info!(?intent, "no spotify credential available, playback intent skipped");
            return;
        };
        if self.gate.is_blocked() {
            info!(?intent, "rate limit cooldown active, playback intent skipped");
            return;
        }

        match intent {
            PlaybackIntent::PauseForGuess => self.pause_for_guess(&token).await,
            PlaybackIntent::RevealAndResume => self.reveal_and_resume(&token).await,
            PlaybackIntent::AdvanceTrack { genre } => self.advance_track(&token, genre).await,
            PlaybackIntent::Restart => self.restart(&token).await,
            PlaybackIntent::StartGenre { genre } => self.start_genre(&token, &genre).await,
        }
    }

    /// Fetch the currently playing track for the reveal broadcast.
    /// Best effort: any failure yields empty display fields.
    pub async fn current_answer(&self, identities: &[Uuid]) -> TrackInfo {
        match self.current_track(identities).await {
            CurrentTrack::Playing(track) => track,
            CurrentTrack::NotAuthenticated | CurrentTrack::NothingPlaying => TrackInfo::default(),
        }
    }

    /// Resolve the currently playing track, distinguishing the no-credential case.
    pub async fn current_track(&self, identities: &[Uuid]) -> CurrentTrack {
        let Some(token) = self.access_token(identities).await else {
            return CurrentTrack::NotAuthenticated;
        };
        if self.gate.is_blocked() {
            debug!("rate limit cooldown active, currently-playing lookup skipped");
            return CurrentTrack::NothingPlaying;
        }
        match self.player.currently_playing(&token).await {
            Ok(Some(track)) => CurrentTrack::Playing(track),
            Ok(None) => CurrentTrack::NothingPlaying,
            Err(err) => {
                self.note_failure("get currently playing", &err);
                CurrentTrack::NothingPlaying
            }
        }
    }

    async fn pause_for_guess(&self, token: &str) {
        let snapshot = self.snapshot(token).await;
        if let Some(snapshot) = &snapshot {
            if !snapshot.is_playing {
                info!("spotify pause skipped (already not playing)");
                return;
            }
            if snapshot.pausing_disallowed {
                info!("spotify pause skipped (disallowed by provider)");
                return;
            }
        }
        self.step("pause", self.player.pause(token)).await;
    }

    async fn reveal_and_resume(&self, token: &str) {
        let snapshot = self.snapshot(token).await;
        if snapshot.as_ref().is_some_and(|s| s.is_playing) {
            info!("spotify resume skipped (already playing)");
            return;
        }
        if snapshot.as_ref().is_some_and(|s| s.resuming_disallowed) {
            info!("spotify resume skipped (disallowed by provider)");
            return;
        }
        if !self.step("resume", self.player.resume(token)).await {
            return;
        }
        if snapshot.is_some_and(|s| s.supports_volume) {
            self.step(
                "set reveal volume",
                self.player.set_volume(token, self.reveal_volume),
            )
            .await;
        }
    }

    async fn advance_track(&self, token: &str, genre: Option<String>) {
        let snapshot = self.snapshot(token).await;

        let has_context = genre
            .as_deref()
            .is_some_and(|genre| self.genre_contexts.contains_key(genre));
        if has_context {
            // Playlist-driven mode: the context carries the ordering.
            if !self.step("skip to next", self.player.skip_to_next(token)).await {
                return;
            }
        } else {
            // Ad-hoc mode: rotate through the catalog and start by search.
            let Some(genre) = genre else {
                info!("next track skipped (no genre selected)");
                return;
            };
            let Some(song) = self.next_song(&genre) else {
                info!(genre, "next track skipped (no catalog songs for genre)");
                return;
            };
            let Some(uri) = self.resolve_track_uri(token, &song).await else {
                return;
            };
            if !self
                .step("start track", self.player.play_track(token, &uri))
                .await
            {
                return;
            }
        }

        if snapshot.is_some_and(|s| s.supports_volume) {
            self.step(
                "set play volume",
                self.player.set_volume(token, self.play_volume),
            )
            .await;
        }
    }

    async fn restart(&self, token: &str) {
        let snapshot = self.snapshot(token).await;
        if snapshot.as_ref().is_some_and(|s| s.is_playing) {
            info!("spotify resume skipped (already playing)");
            return;
        }
        if snapshot.as_ref().is_some_and(|s| s.resuming_disallowed) {
            info!("spotify resume skipped (disallowed by provider)");
            return;
        }
        if !self.step("resume", self.player.resume(token)).await {
            return;
        }
        if snapshot.is_some_and(|s| s.supports_volume) {
            self.step(
                "set play volume",
                self.player.set_volume(token, self.play_volume),
            )
            .await;
        }
    }

    async fn start_genre(&self, token: &str, genre: &str) {
        let Some(context_uri) = self.genre_contexts.get(genre) else {
            info!(genre, "no playback context configured, start skipped");
            return;
        };
        if !self
            .step("enable shuffle", self.player.set_shuffle(token, true))
            .await
        {
            return;
        }
        if !self
            .step("start context", self.player.play_context(token, context_uri))
            .await
        {
            return;
        }
        // The context always opens on the same track, which the group has
        // heard before; skip straight to a shuffled one.
        self.step("skip to next", self.player.skip_to_next(token))
            .await;
    }

    /// Resolve a usable access token: the global credential first, then the
    /// first connected identity whose credential resolves and refreshes.
    async fn access_token(&self, identities: &[Uuid]) -> Option<String> {
        match self.tokens.global_access_token().await {
            Ok(token) => {
                debug!("using global spotify token");
                return Some(token);
            }
            Err(TokenError::Missing) => {}
            Err(err) => warn!(error = %err, "global spotify token unusable"),
        }

        for identity in identities {
            match self.tokens.session_access_token(*identity).await {
                Ok(token) => {
                    debug!(%identity, "using session spotify token");
                    return Some(token);
                }
                Err(TokenError::Missing) => {}
                Err(err) => warn!(%identity, error = %err, "session spotify token unusable"),
            }
        }
        None
    }

    /// Best-effort playback snapshot; a failed fetch means "unknown" and the
    /// caller proceeds conservatively.
    async fn snapshot(&self, token: &str) -> Option<PlaybackSnapshot> {
        match self.player.current_playback(token).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.note_failure("get playback", &err);
                None
            }
        }
    }

    /// Run one provider call; returns whether the intent may continue.
    async fn step(&self, what: &str, call: BoxFuture<'static, ApiResult<()>>) -> bool {
        match call.await {
            Ok(()) => {
                info!(what, "spotify call executed");
                true
            }
            Err(err) => {
                self.note_failure(what, &err);
                false
            }
        }
    }

    fn note_failure(&self, what: &str, err: &SpotifyError) {
        if let SpotifyError::RateLimited { retry_after_secs } = err {
            warn!(what, retry_after_secs, "spotify rate limit hit, backing off");
            self.gate.mark_limited(*retry_after_secs);
        } else {
            warn!(what, error = %err, "spotify call failed");
        }
    }

    fn next_song(&self, genre: &str) -> Option<SongItem> {
        let mut rotation = self.rotation.lock().unwrap_or_else(|err| err.into_inner());
        rotation.next(genre, &self.catalog)
    }

    /// Resolve a song to a provider track URI, via the curated URI, the
    /// search cache, or a fresh limit-1 search.
    async fn resolve_track_uri(&self, token: &str, song: &SongItem) -> Option<String> {
        if let Some(uri) = &song.spotify_uri
            && !uri.trim().is_empty()
        {
            return Some(uri.trim().to_owned());
        }

        let query = song.search_query();
        let key = query.to_lowercase();
        if let Some(cached) = self.search_cache.get(&key)
            && cached.expires_at > Instant::now()
        {
            return cached.uri.clone();
        }

        let uri = match self.player.search_track(token, &query).await {
            Ok(uri) => uri,
            Err(err) => {
                self.note_failure("search track", &err);
                return None;
            }
        };
        if uri.is_none() {
            info!(query, "spotify search found no track");
        }

        let ttl = if uri.is_some() {
            SEARCH_CACHE_TTL
        } else {
            SEARCH_MISS_TTL
        };
        self.search_cache.insert(
            key,
            CachedUri {
                uri: uri.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        uri
    }
}
