use axum::Router;

use crate::state::SharedState;

pub mod auth;
pub mod docs;
pub mod health;
pub mod songs;
pub mod spotify;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(websocket::router())
        .merge(spotify::router())
        .merge(auth::router())
        .merge(songs::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
