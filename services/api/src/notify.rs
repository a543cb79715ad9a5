//! Notification fan-out over the presence registry
//!
//! Two delivery modes: broadcast to every bound connection, and targeted
//! delivery to a single username. Both are fire-and-forget; events for
//! unbound or closed connections are dropped, never queued. A reconnecting
//! client discovers missed state by re-fetching the friend and request
//! lists over REST.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::models::Location;
use crate::presence::PresenceRegistry;

/// Events pushed to connected clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A user's position changed; delivered to every connection
    #[serde(rename_all = "camelCase")]
    LocationUpdate { username: String, location: Location },
    /// A new inbound friend request; delivered to the recipient only
    #[serde(rename_all = "camelCase")]
    NewFriendRequest { requester_username: String },
    /// A friend request was accepted; delivered to every connection
    FriendRequestAccepted,
}

/// Pushes events to connections known to the presence registry
#[derive(Clone)]
pub struct Notifier {
    registry: Arc<PresenceRegistry>,
}

impl Notifier {
    pub fn new(registry: Arc<PresenceRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver an event to every currently bound connection
    pub async fn broadcast(&self, event: ServerEvent) {
        let handles = self.registry.handles().await;
        debug!(connections = handles.len(), "Broadcasting event");
        for handle in handles {
            handle.send(event.clone());
        }
    }

    /// Deliver an event to the connection bound to `username`; dropped with
    /// no retry when the user is not connected
    pub async fn notify(&self, username: &str, event: ServerEvent) {
        match self.registry.lookup(username).await {
            Some(handle) => handle.send(event),
            None => debug!(username, "Target not connected, dropping event"),
        }
    }
}
