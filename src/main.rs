//! Binary entrypoint wiring the HTTP, WebSocket, and Spotify layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use guess_the_song_back::{
    config::AppConfig,
    routes,
    songs::SongCatalog,
    spotify::SpotifyClient,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    let catalog = match SongCatalog::load(&config.catalog_path) {
        Ok(catalog) => {
            info!(
                path = %config.catalog_path.display(),
                categories = catalog.categories.len(),
                "loaded song catalog"
            );
            catalog
        }
        Err(err) => {
            warn!(
                path = %config.catalog_path.display(),
                error = %err,
                "failed to load song catalog; continuing with an empty one"
            );
            SongCatalog::empty()
        }
    };

    let client =
        Arc::new(SpotifyClient::new(&config.spotify).context("building spotify client")?);
    let global_refresh_token = config.spotify.global_refresh_token.clone();

    let app_state = AppState::new(config, catalog, client.clone(), client);

    // Seeding refreshes against the account service; keep it off the
    // startup path so the server binds immediately.
    if let Some(refresh_token) = global_refresh_token {
        let state = app_state.clone();
        tokio::spawn(async move {
            state.tokens().seed_global(&refresh_token).await;
        });
    }

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
