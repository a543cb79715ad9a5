//! Friendship graph service
//!
//! Manages the friend-request lifecycle over the user store: a request edge
//! goes from none to pending on send, and is resolved into a symmetric
//! friendship edge on accept. There is no reject; a pending request can
//! only be superseded by acceptance.

use std::sync::Arc;

use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::{PendingRequest, UserLocation};
use crate::notify::{Notifier, ServerEvent};
use crate::repositories::UserStore;

/// Friend-request lifecycle and mutual-edge maintenance
#[derive(Clone)]
pub struct FriendshipService {
    store: Arc<dyn UserStore>,
    notifier: Notifier,
}

impl FriendshipService {
    pub fn new(store: Arc<dyn UserStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Record a pending request from `from_username` to `to_username` and
    /// notify the recipient if they are currently connected
    pub async fn send_request(&self, from_username: &str, to_username: &str) -> ApiResult<()> {
        let me = self
            .store
            .find_by_username(from_username)
            .await?
            .ok_or(ApiError::NotFound)?;
        let mut friend = self
            .store
            .find_by_username(to_username)
            .await?
            .ok_or(ApiError::NotFound)?;

        if friend.friend_requests.contains(&me.id) {
            return Err(ApiError::AlreadyRequested);
        }
        if me.friends.contains(&friend.id) {
            return Err(ApiError::AlreadyFriends);
        }

        friend.friend_requests.push(me.id);
        self.store.save(&friend).await?;

        info!(from = from_username, to = to_username, "Friend request sent");
        self.notifier
            .notify(
                to_username,
                ServerEvent::NewFriendRequest {
                    requester_username: from_username.to_string(),
                },
            )
            .await;

        Ok(())
    }

    /// Resolve a pending request into a mutual friendship
    ///
    /// Safe to re-drive after a partial failure: friend inserts are
    /// membership-checked and the pending entry is removed by exact id
    /// match, so retrying from either side converges to the same symmetric
    /// state. A reciprocal request the accepter may have sent stays pending
    /// on the requester's side.
    pub async fn accept_request(
        &self,
        my_username: &str,
        requester_username: &str,
    ) -> ApiResult<()> {
        let mut me = self
            .store
            .find_by_username(my_username)
            .await?
            .ok_or(ApiError::NotFound)?;
        let mut requester = self
            .store
            .find_by_username(requester_username)
            .await?
            .ok_or(ApiError::NotFound)?;

        if !me.friends.contains(&requester.id) {
            me.friends.push(requester.id);
        }
        if !requester.friends.contains(&me.id) {
            requester.friends.push(me.id);
        }

        me.friend_requests.retain(|id| *id != requester.id);

        self.store.save(&me).await?;
        self.store.save(&requester).await?;

        info!(
            accepter = my_username,
            requester = requester_username,
            "Friend request accepted"
        );
        self.notifier.broadcast(ServerEvent::FriendRequestAccepted).await;

        Ok(())
    }

    /// Usernames and positions of a user's friends
    pub async fn friends_of(&self, username: &str) -> ApiResult<Vec<UserLocation>> {
        let user = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(ApiError::NotFound)?;
        let friends = self.store.find_by_ids(&user.friends).await?;

        Ok(friends
            .into_iter()
            .map(|friend| UserLocation {
                username: friend.username,
                location: friend.location,
            })
            .collect())
    }

    /// Pending inbound requests for a user
    pub async fn pending_requests(&self, username: &str) -> ApiResult<Vec<PendingRequest>> {
        let user = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(ApiError::NotFound)?;
        let requesters = self.store.find_by_ids(&user.friend_requests).await?;

        Ok(requesters
            .into_iter()
            .map(|requester| PendingRequest {
                username: requester.username,
                id: requester.id,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::{ConnectionHandle, PresenceRegistry};
    use crate::repositories::MemoryUserStore;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    struct Fixture {
        store: Arc<MemoryUserStore>,
        registry: Arc<PresenceRegistry>,
        service: FriendshipService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryUserStore::new());
        let registry = Arc::new(PresenceRegistry::new());
        let notifier = Notifier::new(registry.clone());
        let service = FriendshipService::new(store.clone(), notifier);
        Fixture {
            store,
            registry,
            service,
        }
    }

    async fn connect(
        registry: &PresenceRegistry,
        username: &str,
    ) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        registry
            .bind(username, ConnectionHandle::new(Uuid::new_v4(), tx))
            .await;
        rx
    }

    #[tokio::test]
    async fn test_send_request_records_pending_entry() {
        let f = fixture();
        let alice = f.store.create("alice", "hash").await.unwrap();
        f.store.create("bob", "hash").await.unwrap();

        f.service.send_request("alice", "bob").await.unwrap();

        let bob = f.store.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(bob.friend_requests, vec![alice.id]);
    }

    #[tokio::test]
    async fn test_send_request_unknown_users() {
        let f = fixture();
        f.store.create("alice", "hash").await.unwrap();

        assert!(matches!(
            f.service.send_request("alice", "ghost").await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            f.service.send_request("ghost", "alice").await,
            Err(ApiError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_send_request_rejected() {
        let f = fixture();
        f.store.create("alice", "hash").await.unwrap();
        f.store.create("bob", "hash").await.unwrap();

        f.service.send_request("alice", "bob").await.unwrap();
        assert!(matches!(
            f.service.send_request("alice", "bob").await,
            Err(ApiError::AlreadyRequested)
        ));

        // No duplicate pending entry was recorded.
        let bob = f.store.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(bob.friend_requests.len(), 1);
    }

    #[tokio::test]
    async fn test_send_request_to_existing_friend_rejected() {
        let f = fixture();
        f.store.create("alice", "hash").await.unwrap();
        f.store.create("bob", "hash").await.unwrap();

        f.service.send_request("alice", "bob").await.unwrap();
        f.service.accept_request("bob", "alice").await.unwrap();

        assert!(matches!(
            f.service.send_request("alice", "bob").await,
            Err(ApiError::AlreadyFriends)
        ));
    }

    #[tokio::test]
    async fn test_accept_creates_symmetric_friendship() {
        let f = fixture();
        f.store.create("alice", "hash").await.unwrap();
        f.store.create("bob", "hash").await.unwrap();

        f.service.send_request("alice", "bob").await.unwrap();
        f.service.accept_request("bob", "alice").await.unwrap();

        let alice = f.store.find_by_username("alice").await.unwrap().unwrap();
        let bob = f.store.find_by_username("bob").await.unwrap().unwrap();
        assert!(alice.friends.contains(&bob.id));
        assert!(bob.friends.contains(&alice.id));
        assert!(!bob.friend_requests.contains(&alice.id));
    }

    #[tokio::test]
    async fn test_accept_is_idempotent() {
        let f = fixture();
        f.store.create("alice", "hash").await.unwrap();
        f.store.create("bob", "hash").await.unwrap();

        f.service.send_request("alice", "bob").await.unwrap();
        f.service.accept_request("bob", "alice").await.unwrap();
        f.service.accept_request("bob", "alice").await.unwrap();

        let alice = f.store.find_by_username("alice").await.unwrap().unwrap();
        let bob = f.store.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(alice.friends.len(), 1);
        assert_eq!(bob.friends.len(), 1);
    }

    #[tokio::test]
    async fn test_accept_preserves_reciprocal_pending_request() {
        let f = fixture();
        f.store.create("alice", "hash").await.unwrap();
        f.store.create("bob", "hash").await.unwrap();

        // Both users requested each other before either accepted.
        f.service.send_request("alice", "bob").await.unwrap();
        f.service.send_request("bob", "alice").await.unwrap();

        f.service.accept_request("bob", "alice").await.unwrap();

        let alice = f.store.find_by_username("alice").await.unwrap().unwrap();
        let bob = f.store.find_by_username("bob").await.unwrap().unwrap();
        assert!(!bob.friend_requests.contains(&alice.id));
        // The accepter's own outbound request stays pending on the other side.
        assert!(alice.friend_requests.contains(&bob.id));
    }

    #[tokio::test]
    async fn test_send_request_notifies_connected_recipient() {
        let f = fixture();
        f.store.create("alice", "hash").await.unwrap();
        f.store.create("bob", "hash").await.unwrap();
        let mut bob_rx = connect(&f.registry, "bob").await;

        f.service.send_request("alice", "bob").await.unwrap();

        assert_eq!(
            bob_rx.try_recv().unwrap(),
            ServerEvent::NewFriendRequest {
                requester_username: "alice".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_send_request_to_offline_recipient_still_persists() {
        let f = fixture();
        let alice = f.store.create("alice", "hash").await.unwrap();
        f.store.create("bob", "hash").await.unwrap();

        // Bob is not connected; the notification is dropped, the edge is not.
        f.service.send_request("alice", "bob").await.unwrap();

        let bob = f.store.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(bob.friend_requests, vec![alice.id]);
    }

    #[tokio::test]
    async fn test_only_latest_binding_receives_targeted_event() {
        let f = fixture();
        f.store.create("alice", "hash").await.unwrap();
        f.store.create("bob", "hash").await.unwrap();

        let mut stale_rx = connect(&f.registry, "bob").await;
        let mut fresh_rx = connect(&f.registry, "bob").await;

        f.service.send_request("alice", "bob").await.unwrap();

        assert!(fresh_rx.try_recv().is_ok());
        assert!(stale_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_accept_broadcasts_to_all_connections() {
        let f = fixture();
        f.store.create("alice", "hash").await.unwrap();
        f.store.create("bob", "hash").await.unwrap();
        f.store.create("carol", "hash").await.unwrap();

        f.service.send_request("alice", "bob").await.unwrap();

        let mut alice_rx = connect(&f.registry, "alice").await;
        let mut carol_rx = connect(&f.registry, "carol").await;

        f.service.accept_request("bob", "alice").await.unwrap();

        // Acceptance is announced to every connection, bystanders included.
        assert_eq!(alice_rx.try_recv().unwrap(), ServerEvent::FriendRequestAccepted);
        assert_eq!(carol_rx.try_recv().unwrap(), ServerEvent::FriendRequestAccepted);
    }

    #[tokio::test]
    async fn test_reads_resolve_usernames_and_positions() {
        let f = fixture();
        let alice = f.store.create("alice", "hash").await.unwrap();
        f.store.create("bob", "hash").await.unwrap();

        f.service.send_request("alice", "bob").await.unwrap();

        let pending = f.service.pending_requests("bob").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].username, "alice");
        assert_eq!(pending[0].id, alice.id);

        f.service.accept_request("bob", "alice").await.unwrap();

        let friends = f.service.friends_of("bob").await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].username, "alice");

        assert!(f.service.pending_requests("bob").await.unwrap().is_empty());
        assert!(matches!(
            f.service.friends_of("ghost").await,
            Err(ApiError::NotFound)
        ));
    }

    /// Full register-to-friendship flow from the product scenario
    #[tokio::test]
    async fn test_alice_and_bob_scenario() {
        let f = fixture();
        f.store.create("alice", "pw123-hash").await.unwrap();
        let bob = f.store.create("bob", "pw456-hash").await.unwrap();

        f.service.send_request("alice", "bob").await.unwrap();
        let pending = f.service.pending_requests("bob").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].username, "alice");

        f.service.accept_request("bob", "alice").await.unwrap();

        let alice = f.store.find_by_username("alice").await.unwrap().unwrap();
        let bob_doc = f.store.find_by_username("bob").await.unwrap().unwrap();
        assert!(alice.friends.contains(&bob.id));
        assert!(bob_doc.friends.contains(&alice.id));
        assert!(!bob_doc.friend_requests.contains(&alice.id));
    }
}
