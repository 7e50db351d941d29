use axum::{Json, Router, extract::State, routing::get};
use indexmap::IndexMap;

use crate::{songs::SongItem, state::SharedState};

#[utoipa::path(
    get,
    path = "/songs",
    tag = "songs",
    responses((status = 200, description = "Catalog songs grouped by genre label"))
)]
/// List the song catalog grouped by genre label, preserving file order.
pub async fn list_songs(State(state): State<SharedState>) -> Json<IndexMap<String, Vec<SongItem>>> {
    Json(state.catalog().by_label())
}

/// Configure the song catalog routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/songs", get(list_songs))
}
