use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the game backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::spotify::status,
        crate::routes::spotify::current,
        crate::routes::auth::login,
        crate::routes::auth::callback,
        crate::routes::auth::logout,
        crate::routes::songs::list_songs,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::spotify::SpotifyStatus,
            crate::dto::spotify::NotPlaying,
            crate::dto::spotify::NowPlaying,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::songs::SongItem,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "WebSocket operations for game clients"),
        (name = "spotify", description = "Spotify authentication and playback status"),
        (name = "songs", description = "Song catalog listing"),
    )
)]
pub struct ApiDoc;
