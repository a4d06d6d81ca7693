//! Table of live connections and their negotiated state.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use crate::protocol::negotiation::{ConnectionId, ConnectionPhase, ConnectionState};
use crate::types::{McpError, McpResult, Message};

/// One live connection.
#[derive(Debug)]
struct ConnectionEntry {
    state: ConnectionState,
    /// Queue feeding the connection's writer. `None` for transports that
    /// cannot push unsolicited messages.
    outbound: Option<mpsc::Sender<Message>>,
    /// Last time a request arrived for a connection without a socket.
    last_seen: Instant,
}

/// Snapshot of a connection for introspection.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    pub id: ConnectionId,
    pub phase: ConnectionPhase,
    pub root_uri: String,
    pub connected_at: DateTime<Utc>,
}

/// Live connections keyed by id.
///
/// Entries are created on connect, mutated only by the handshake handlers,
/// and removed on disconnect or, for queue-less connections, once idle.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    entries: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and return its id.
    pub async fn open(&self, outbound: Option<mpsc::Sender<Message>>) -> ConnectionId {
        let id = Uuid::new_v4();
        let entry = ConnectionEntry {
            state: ConnectionState::new(),
            outbound,
            last_seen: Instant::now(),
        };
        self.entries.write().await.insert(id, entry);
        id
    }

    /// Drop a connection's state. Returns whether it existed.
    pub async fn close(&self, id: ConnectionId) -> bool {
        self.entries.write().await.remove(&id).is_some()
    }

    /// Mark a connection as active now. Returns whether it exists.
    pub async fn touch(&self, id: ConnectionId) -> bool {
        match self.entries.write().await.get_mut(&id) {
            Some(entry) => {
                entry.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Drop queue-less connections idle for longer than `max_idle` and
    /// return their ids. Socket-backed connections end with their socket
    /// and are never reaped here.
    pub async fn reap_idle(&self, max_idle: Duration) -> Vec<ConnectionId> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let idle: Vec<ConnectionId> = entries
            .iter()
            .filter(|(_, e)| e.outbound.is_none() && now.duration_since(e.last_seen) > max_idle)
            .map(|(id, _)| *id)
            .collect();
        for id in &idle {
            entries.remove(id);
        }
        idle
    }

    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.entries.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Run `f` against a connection's state under the write lock.
    pub async fn with_state<R>(
        &self,
        id: ConnectionId,
        f: impl FnOnce(&mut ConnectionState) -> R,
    ) -> McpResult<R> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| McpError::Internal(format!("unknown connection {id}")))?;
        Ok(f(&mut entry.state))
    }

    /// Clone of a connection's state.
    pub async fn state(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.entries.read().await.get(&id).map(|e| e.state.clone())
    }

    /// Outbound queue of one connection.
    pub async fn sender(&self, id: ConnectionId) -> Option<mpsc::Sender<Message>> {
        self.entries
            .read()
            .await
            .get(&id)
            .and_then(|e| e.outbound.clone())
    }

    /// Outbound queues of every connection that has one.
    pub async fn senders(&self) -> Vec<(ConnectionId, mpsc::Sender<Message>)> {
        self.entries
            .read()
            .await
            .iter()
            .filter_map(|(id, e)| e.outbound.clone().map(|tx| (*id, tx)))
            .collect()
    }

    pub async fn summaries(&self) -> Vec<ConnectionSummary> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(id, e)| ConnectionSummary {
                id: *id,
                phase: e.state.phase,
                root_uri: e.state.root_uri.clone(),
                connected_at: e.state.connected_at,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_and_close() {
        let table = ConnectionTable::new();
        let id = table.open(None).await;
        assert!(table.contains(id).await);
        assert_eq!(table.len().await, 1);

        assert!(table.close(id).await);
        assert!(!table.close(id).await);
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn with_state_on_unknown_connection_fails() {
        let table = ConnectionTable::new();
        let err = table
            .with_state(Uuid::new_v4(), |s| s.initialized)
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Internal(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn reap_idle_spares_active_and_socket_connections() {
        let table = ConnectionTable::new();
        let (tx, _rx) = mpsc::channel(1);
        let socket = table.open(Some(tx)).await;
        let stale = table.open(None).await;
        let active = table.open(None).await;

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(table.touch(active).await);
        tokio::time::advance(Duration::from_secs(20)).await;

        let reaped = table.reap_idle(Duration::from_secs(60)).await;
        assert_eq!(reaped, vec![stale]);
        assert!(table.contains(socket).await);
        assert!(table.contains(active).await);
        assert!(!table.touch(stale).await);
    }

    #[tokio::test]
    async fn senders_skip_connections_without_queue() {
        let table = ConnectionTable::new();
        let (tx, _rx) = mpsc::channel(1);
        let pushed = table.open(Some(tx)).await;
        table.open(None).await;

        let senders = table.senders().await;
        assert_eq!(senders.len(), 1);
        assert_eq!(senders[0].0, pushed);
    }
}
