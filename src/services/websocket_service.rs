//! WebSocket connection lifecycle and game message handling.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    state::{ClientConnection, GameEvent, SharedState, connections},
};

/// Handle the full lifecycle of one game client connection.
///
/// The optional `identity` ties the connection to a previously completed
/// Spotify login so its credential counts while this client stays connected.
pub async fn handle_socket(state: SharedState, socket: WebSocket, identity: Option<Uuid>) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps broadcasts flowing while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4();
    state.connections().add(ClientConnection {
        id: connection_id,
        identity,
        tx: outbound_tx.clone(),
    });
    info!(id = %connection_id, connections = state.connections().len(), "client connected");

    if send_welcome(&state, connection_id, &outbound_tx).await.is_err() {
        info!(id = %connection_id, "connection closed during welcome");
        state.connections().remove(&connection_id);
        finalize(writer_task, outbound_tx).await;
        return;
    }

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_text(&state, &text).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(id = %connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.connections().remove(&connection_id);
    info!(id = %connection_id, connections = state.connections().len(), "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Bring a fresh connection up to date: its connection id, the state snapshot,
/// and a replay of the most recent broadcast so late joiners see the round.
async fn send_welcome(
    state: &SharedState,
    connection_id: Uuid,
    tx: &mpsc::UnboundedSender<Message>,
) -> Result<(), mpsc::error::SendError<Message>> {
    tx.send(Message::Text(format!("connected:{connection_id}").into()))?;

    let (genre, last_broadcast) = state.game_snapshot().await;
    let snapshot = ServerMessage::State {
        spotify_connected: state.spotify_connected().await,
        genre_name: genre.clone(),
    };
    if let Some(text) = connections::encode(&snapshot) {
        tx.send(Message::Text(text.into()))?;
    }

    if let Some(broadcast) = last_broadcast
        && let Some(text) = replay_payload(&broadcast, genre.as_deref())
    {
        tx.send(Message::Text(text.into()))?;
    }
    Ok(())
}

/// Parse one inbound frame and run the resulting game transition.
async fn handle_text(state: &SharedState, text: &str) {
    let message = match ClientMessage::from_json_str(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, payload = %text, "failed to parse client message");
            return;
        }
    };

    let event = match message {
        ClientMessage::NewGame { genre_name } => GameEvent::NewGame { genre: genre_name },
        ClientMessage::GenreChange { genre_name } => GameEvent::GenreChange { genre: genre_name },
        ClientMessage::PlayerGuess { player_name } => GameEvent::PlayerGuess {
            player: player_name,
        },
        // The track is fetched before the transition so the reveal broadcast
        // carries it atomically with the state change.
        ClientMessage::ShowAnswer => GameEvent::ShowAnswer {
            track: state.current_answer().await,
        },
        ClientMessage::NextRound => GameEvent::NextRound,
        ClientMessage::GuessAgain => GameEvent::GuessAgain,
        ClientMessage::Unknown => {
            warn!(payload = %text, "ignoring unrecognized client message type");
            return;
        }
    };

    if let Some(intent) = state.apply_game_event(event).await {
        state.run_intent(intent).await;
    }
}

/// Re-encode a retained broadcast for replay, folding in the selected genre
/// when the payload does not already carry one.
fn replay_payload(broadcast: &ServerMessage, genre: Option<&str>) -> Option<String> {
    let mut value = serde_json::to_value(broadcast).ok()?;
    if let (Some(genre), Some(object)) = (genre, value.as_object_mut())
        && !object.contains_key("genreName")
    {
        object.insert("genreName".into(), genre.into());
    }
    serde_json::to_string(&value).ok()
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
