//! Presence registry: process-local map from user identity to a live
//! connection handle
//!
//! Only one connection per user is tracked. A second login for the same
//! username replaces the binding; the orphaned handle stays alive until its
//! own disconnect fires, which is why unbinding matches on connection
//! identity rather than username alone. Nothing here is persisted; the map
//! is rebuilt from scratch on restart.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use crate::notify::ServerEvent;

/// Identity of a single websocket connection
pub type ConnId = Uuid;

/// Sending half of a connection, cloneable across the service
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    conn_id: ConnId,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(conn_id: ConnId, tx: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self { conn_id, tx }
    }

    pub fn conn_id(&self) -> ConnId {
        self.conn_id
    }

    /// Push an event to the connected client; delivery is fire-and-forget
    pub fn send(&self, event: ServerEvent) {
        if self.tx.send(event).is_err() {
            debug!(conn_id = %self.conn_id, "Dropping event for closed connection");
        }
    }
}

/// Registry of currently bound connections, owned by the transport layer
///
/// Constructed at startup and shared behind an `Arc`; torn down with the
/// process.
#[derive(Default)]
pub struct PresenceRegistry {
    bindings: RwLock<HashMap<String, ConnectionHandle>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a username to a connection, replacing any prior binding
    pub async fn bind(&self, username: &str, handle: ConnectionHandle) {
        let mut bindings = self.bindings.write().await;
        if let Some(previous) = bindings.insert(username.to_string(), handle) {
            debug!(
                username,
                conn_id = %previous.conn_id(),
                "Replaced existing presence binding"
            );
        }
    }

    /// Remove the binding for `username`, but only when it still belongs to
    /// `conn_id`; a fresher login for the same user is left untouched
    pub async fn unbind(&self, username: &str, conn_id: ConnId) -> bool {
        let mut bindings = self.bindings.write().await;
        match bindings.get(username) {
            Some(handle) if handle.conn_id() == conn_id => {
                bindings.remove(username);
                true
            }
            _ => false,
        }
    }

    /// Connection currently bound to `username`, if any
    pub async fn lookup(&self, username: &str) -> Option<ConnectionHandle> {
        self.bindings.read().await.get(username).cloned()
    }

    /// Snapshot of every bound connection, for broadcast delivery
    pub async fn handles(&self) -> Vec<ConnectionHandle> {
        self.bindings.read().await.values().cloned().collect()
    }

    /// Number of currently bound connections
    pub async fn len(&self) -> usize {
        self.bindings.read().await.len()
    }
}
