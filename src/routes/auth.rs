use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::get,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{error::AppError, spotify, state::SharedState};

/// Query parameters of the OAuth callback redirect.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code, present on success.
    code: Option<String>,
    /// State nonce minted by the login redirect.
    state: Option<Uuid>,
    /// Error code, present when the user refused the grant.
    error: Option<String>,
}

/// Query parameters for logout.
#[derive(Debug, Deserialize)]
pub struct LogoutQuery {
    /// Identity whose credential is discarded.
    identity: Uuid,
}

#[utoipa::path(
    get,
    path = "/spotify/login",
    tag = "spotify",
    responses((status = 307, description = "Redirect to the Spotify authorization page"))
)]
/// Start the authorization-code flow by redirecting to the provider.
pub async fn login(State(state): State<SharedState>) -> Redirect {
    let nonce = state.mint_auth_state();
    Redirect::temporary(&spotify::authorize_url(&state.config().spotify, nonce))
}

#[utoipa::path(
    get,
    path = "/spotify/callback",
    tag = "spotify",
    responses(
        (status = 307, description = "Login completed, redirect back to the frontend"),
        (status = 401, description = "Refused grant, unknown state, or failed exchange"),
    )
)]
/// Complete the authorization-code flow and hand the identity to the frontend.
pub async fn callback(
    State(state): State<SharedState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, AppError> {
    if let Some(error) = query.error {
        warn!(error, "spotify login refused by the user or the provider");
        return Err(AppError::Unauthorized(format!(
            "spotify login refused: {error}"
        )));
    }

    let nonce = query
        .state
        .ok_or_else(|| AppError::BadRequest("missing oauth state".into()))?;
    if !state.consume_auth_state(nonce) {
        return Err(AppError::Unauthorized(
            "unknown or expired oauth state".into(),
        ));
    }

    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest("missing authorization code".into()))?;
    let identity = state.tokens().login(&code).await.map_err(|err| {
        warn!(error = %err, "authorization code exchange failed");
        AppError::Unauthorized("authorization code exchange failed".into())
    })?;

    info!(%identity, "spotify login completed");
    Ok(Redirect::temporary(&format!("/?identity={identity}")))
}

#[utoipa::path(
    get,
    path = "/spotify/logout",
    tag = "spotify",
    responses((status = 204, description = "Credential discarded"))
)]
/// Discard the session credential stored for an identity.
pub async fn logout(
    State(state): State<SharedState>,
    Query(query): Query<LogoutQuery>,
) -> StatusCode {
    state.tokens().remove_session(query.identity);
    info!(identity = %query.identity, "spotify session discarded");
    StatusCode::NO_CONTENT
}

/// Configure the OAuth routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/spotify/login", get(login))
        .route("/spotify/callback", get(callback))
        .route("/spotify/logout", get(logout))
}
