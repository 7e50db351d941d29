//! Registry of open client WebSocket channels.

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dto::ws::ServerMessage;

/// Handle used to push frames to one connected client.
#[derive(Clone)]
pub struct ClientConnection {
    /// Unique connection identifier.
    pub id: Uuid,
    /// Stable identity under which a session credential may be resolved.
    pub identity: Option<Uuid>,
    /// Writer channel feeding the connection's outbound task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Concurrent set of open client channels.
///
/// Stale entries are pruned as a side effect of broadcasting: a failed send
/// means the writer task is gone and the connection is dropped from the set.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, ClientConnection>,
}

impl ConnectionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened connection.
    pub fn add(&self, connection: ClientConnection) {
        self.connections.insert(connection.id, connection);
    }

    /// Stop tracking a connection after it closes.
    pub fn remove(&self, id: &Uuid) {
        self.connections.remove(id);
    }

    /// Number of currently tracked connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection is currently tracked.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Snapshot of the identities attached to current connections.
    pub fn identities(&self) -> Vec<Uuid> {
        self.connections
            .iter()
            .filter_map(|entry| entry.identity)
            .collect()
    }

    /// Send a message to every tracked connection, fire-and-forget per
    /// recipient. Connections whose channel is gone are removed.
    pub fn broadcast(&self, message: &ServerMessage) {
        let Some(text) = encode(message) else {
            return;
        };

        let mut stale = Vec::new();
        for entry in self.connections.iter() {
            if entry.tx.send(Message::Text(text.clone().into())).is_err() {
                stale.push(*entry.key());
            }
        }
        for id in stale {
            info!(id = %id, "pruning stale connection after failed broadcast send");
            self.connections.remove(&id);
        }
    }
}

/// Serialize an outbound message, logging instead of failing on the
/// (unreachable in practice) serializer error.
pub fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(error = %err, "failed to serialize outbound message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(identity: Option<Uuid>) -> (ClientConnection, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ClientConnection {
                id: Uuid::new_v4(),
                identity,
                tx,
            },
            rx,
        )
    }

    #[tokio::test]
    async fn broadcast_reaches_every_live_connection() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = connection(None);
        let (b, mut rx_b) = connection(None);
        registry.add(a);
        registry.add(b);

        registry.broadcast(&ServerMessage::NextRound);

        for rx in [&mut rx_a, &mut rx_b] {
            let Some(Message::Text(text)) = rx.recv().await else {
                panic!("expected a text frame");
            };
            assert!(text.as_str().contains("nextRound"));
        }
    }

    #[tokio::test]
    async fn dead_connections_are_pruned_and_do_not_block_others() {
        let registry = ConnectionRegistry::new();
        let (a, rx_a) = connection(None);
        let (b, mut rx_b) = connection(None);
        registry.add(a);
        registry.add(b);
        drop(rx_a);

        registry.broadcast(&ServerMessage::GuessAgain);

        assert_eq!(registry.len(), 1);
        assert!(rx_b.recv().await.is_some());
    }

    #[tokio::test]
    async fn identities_snapshot_skips_anonymous_connections() {
        let registry = ConnectionRegistry::new();
        let identity = Uuid::new_v4();
        let (a, _rx_a) = connection(Some(identity));
        let (b, _rx_b) = connection(None);
        registry.add(a);
        registry.add(b);

        assert_eq!(registry.identities(), vec![identity]);
    }
}
