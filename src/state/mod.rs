//! Shared application state and the atomic transition-broadcast path.

/// Registry of open client channels.
pub mod connections;
/// The authoritative game state and its transitions.
pub mod game;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dto::ws::ServerMessage;
use crate::songs::SongCatalog;
use crate::spotify::api::{AuthApi, PlayerApi, TrackInfo};
use crate::spotify::playback::{CurrentTrack, PlaybackIntent, PlaybackService};
use crate::spotify::rate_limit::RateLimitGate;
use crate::spotify::token::TokenStore;

pub use connections::{ClientConnection, ConnectionRegistry};
pub use game::{GameEvent, GameState};

/// Cheaply cloneable handle to the application state.
pub type SharedState = Arc<AppState>;

/// How long a minted OAuth state nonce stays valid.
const AUTH_STATE_TTL: Duration = Duration::from_secs(10 * 60);

/// Central application state: the game, the connections, and the Spotify side.
pub struct AppState {
    config: Arc<AppConfig>,
    catalog: Arc<SongCatalog>,
    connections: ConnectionRegistry,
    /// The one lock serializing all game-state mutations and their broadcasts.
    game: Mutex<GameState>,
    tokens: Arc<TokenStore>,
    playback: PlaybackService,
    /// Pending OAuth state nonces with their mint time.
    auth_states: DashMap<Uuid, Instant>,
}

impl AppState {
    /// Wire up the shared state from configuration and provider clients.
    pub fn new(
        config: AppConfig,
        catalog: SongCatalog,
        player: Arc<dyn PlayerApi>,
        auth: Arc<dyn AuthApi>,
    ) -> SharedState {
        let config = Arc::new(config);
        let catalog = Arc::new(catalog);
        let tokens = Arc::new(TokenStore::new(auth));
        let gate = Arc::new(RateLimitGate::new());
        let playback = PlaybackService::new(
            player,
            tokens.clone(),
            gate,
            catalog.clone(),
            config.genre_contexts.clone(),
            config.reveal_volume,
            config.play_volume,
        );

        Arc::new(Self {
            config,
            catalog,
            connections: ConnectionRegistry::new(),
            game: Mutex::new(GameState::new()),
            tokens,
            playback,
            auth_states: DashMap::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The song catalog loaded at startup.
    pub fn catalog(&self) -> &SongCatalog {
        &self.catalog
    }

    /// Registry of open client channels.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// The credential store.
    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Apply one game event: mutate state and broadcast atomically under the
    /// state lock, then hand back the playback intent to run lock-free.
    pub async fn apply_game_event(&self, event: GameEvent) -> Option<PlaybackIntent> {
        let mut game = self.game.lock().await;
        let transition = game.apply(event);
        if let Some(broadcast) = &transition.broadcast {
            self.connections.broadcast(broadcast);
        }
        transition.intent
    }

    /// Drive the playback provider for an intent, resolving credentials over
    /// a snapshot of the currently connected identities.
    pub async fn run_intent(&self, intent: PlaybackIntent) {
        let identities = self.connections.identities();
        self.playback.run(intent, &identities).await;
    }

    /// Currently playing track for the reveal broadcast; empty fields on failure.
    pub async fn current_answer(&self) -> TrackInfo {
        let identities = self.connections.identities();
        self.playback.current_answer(&identities).await
    }

    /// Currently playing track for the diagnostics endpoint.
    pub async fn current_track(&self) -> CurrentTrack {
        let identities = self.connections.identities();
        self.playback.current_track(&identities).await
    }

    /// Selected genre and last broadcast, for late-joiner replay.
    pub async fn game_snapshot(&self) -> (Option<String>, Option<ServerMessage>) {
        let game = self.game.lock().await;
        (
            game.selected_genre().map(str::to_owned),
            game.last_broadcast().cloned(),
        )
    }

    /// Whether any usable credential exists for the current connections.
    pub async fn spotify_connected(&self) -> bool {
        let identities = self.connections.identities();
        self.tokens.is_connected(&identities).await
    }

    /// Mint a fresh OAuth state nonce for a login redirect.
    pub fn mint_auth_state(&self) -> Uuid {
        let state = Uuid::new_v4();
        self.auth_states.insert(state, Instant::now());
        state
    }

    /// Consume an OAuth state nonce; false when unknown or expired.
    pub fn consume_auth_state(&self, state: Uuid) -> bool {
        self.auth_states
            .retain(|_, minted| minted.elapsed() < AUTH_STATE_TTL);
        self.auth_states.remove(&state).is_some()
    }
}
