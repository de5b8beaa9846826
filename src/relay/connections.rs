//! Outbound connection table
//!
//! Maps connection ids to the sending half of each connection's outbound
//! queue. The queue is drained by the connection's writer task, so pushing
//! an event here never blocks on the network.

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;

use crate::protocol::{ConnectionId, ServerEvent};

/// Table of live connections and their outbound senders
pub struct ConnectionTable {
    connections: RwLock<HashMap<ConnectionId, UnboundedSender<ServerEvent>>>,
}

impl ConnectionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection's outbound sender
    pub async fn insert(&self, id: ConnectionId, tx: UnboundedSender<ServerEvent>) {
        self.connections.write().await.insert(id, tx);
    }

    /// Remove a connection
    ///
    /// Removing an id that is already gone is a no-op.
    pub async fn remove(&self, id: ConnectionId) {
        self.connections.write().await.remove(&id);
    }

    /// Send an event to one connection
    ///
    /// Delivery is best-effort: an unknown id or a closed queue is ignored.
    pub async fn send_to(&self, id: ConnectionId, event: ServerEvent) {
        let connections = self.connections.read().await;
        if let Some(tx) = connections.get(&id) {
            let _ = tx.send(event);
        }
    }

    /// Send an event to each listed connection
    ///
    /// An unreachable recipient never aborts delivery to the rest.
    pub async fn send_each(&self, ids: &[ConnectionId], event: &ServerEvent) {
        let connections = self.connections.read().await;
        for id in ids {
            if let Some(tx) = connections.get(id) {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Send an event to every live connection
    pub async fn broadcast_all(&self, event: &ServerEvent) {
        let connections = self.connections.read().await;
        for tx in connections.values() {
            let _ = tx.send(event.clone());
        }
    }

    /// Number of live connections
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether the table is empty
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_send_to_unknown_id_is_noop() {
        let table = ConnectionTable::new();
        table.send_to(ConnectionId(42), ServerEvent::StreamEnded).await;
    }

    #[tokio::test]
    async fn test_send_each_skips_dead_recipients() {
        let table = ConnectionTable::new();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        table.insert(ConnectionId(1), tx1).await;
        table.insert(ConnectionId(2), tx2).await;

        // Receiver 2 is gone; delivery to 1 must still happen
        drop(rx2);

        table
            .send_each(&[ConnectionId(1), ConnectionId(2)], &ServerEvent::StreamEnded)
            .await;

        assert_eq!(rx1.recv().await, Some(ServerEvent::StreamEnded));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let table = ConnectionTable::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        table.insert(ConnectionId(1), tx).await;
        table.remove(ConnectionId(1)).await;
        table.remove(ConnectionId(1)).await;

        assert!(table.is_empty().await);
    }
}
