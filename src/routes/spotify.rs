use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    dto::spotify::{NotPlaying, NowPlaying, SpotifyStatus},
    error::AppError,
    spotify::CurrentTrack,
    state::SharedState,
};

/// Query parameters for the status endpoint.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Identity whose session credential is being checked.
    identity: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/spotify/status",
    tag = "spotify",
    responses((status = 200, description = "Authentication status", body = SpotifyStatus))
)]
/// Report whether the queried identity and the global credential are usable.
pub async fn status(
    State(state): State<SharedState>,
    Query(query): Query<StatusQuery>,
) -> Json<SpotifyStatus> {
    let authenticated = query
        .identity
        .is_some_and(|identity| state.tokens().has_session(identity));
    Json(SpotifyStatus {
        authenticated,
        global_authenticated: state.tokens().has_global().await,
    })
}

#[utoipa::path(
    get,
    path = "/spotify/current",
    tag = "spotify",
    responses(
        (status = 200, description = "Currently playing track or nothing", body = NowPlaying),
        (status = 401, description = "No usable Spotify credential"),
    )
)]
/// Return the currently playing track, for diagnostics and manual checks.
pub async fn current(State(state): State<SharedState>) -> Result<Response, AppError> {
    match state.current_track().await {
        CurrentTrack::NotAuthenticated => Err(AppError::Unauthorized(
            "no spotify credential available".into(),
        )),
        CurrentTrack::NothingPlaying => Ok(Json(NotPlaying::new()).into_response()),
        CurrentTrack::Playing(track) => Ok(Json(NowPlaying::from(track)).into_response()),
    }
}

/// Configure the Spotify status routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/spotify/status", get(status))
        .route("/spotify/current", get(current))
}
