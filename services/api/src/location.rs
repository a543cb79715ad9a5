//! Location ingest: persists position updates and fans them out

use std::sync::Arc;

use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::{User, UserLocation};
use crate::notify::{Notifier, ServerEvent};
use crate::repositories::UserStore;

/// Accepts position updates and serves the shared map view
#[derive(Clone)]
pub struct LocationService {
    store: Arc<dyn UserStore>,
    notifier: Notifier,
}

impl LocationService {
    pub fn new(store: Arc<dyn UserStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Persist a position update and broadcast it to every connection
    ///
    /// The broadcast is global rather than scoped to friends; clients
    /// filter what they render.
    pub async fn update_location(&self, username: &str, lat: f64, lng: f64) -> ApiResult<User> {
        let user = self.store.update_location(username, lat, lng).await?;

        info!(username, lat, lng, "Location updated");
        self.notifier
            .broadcast(ServerEvent::LocationUpdate {
                username: user.username.clone(),
                location: user.location.clone(),
            })
            .await;

        Ok(user)
    }

    /// Every user with their current position, for the shared map
    pub async fn all_locations(&self) -> ApiResult<Vec<UserLocation>> {
        let users = self.store.all().await?;
        Ok(users
            .into_iter()
            .map(|user| UserLocation {
                username: user.username,
                location: user.location,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::{ConnectionHandle, PresenceRegistry};
    use crate::repositories::MemoryUserStore;
    use chrono::Utc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    struct Fixture {
        store: Arc<MemoryUserStore>,
        registry: Arc<PresenceRegistry>,
        service: LocationService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryUserStore::new());
        let registry = Arc::new(PresenceRegistry::new());
        let notifier = Notifier::new(registry.clone());
        let service = LocationService::new(store.clone(), notifier);
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
    async fn test_location_roundtrip_refreshes_timestamp() {
        let f = fixture();
        f.store.create("alice", "hash").await.unwrap();

        let before = Utc::now();
        f.service.update_location("alice", 10.5, -20.3).await.unwrap();

        let alice = f.store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(alice.location.lat, 10.5);
        assert_eq!(alice.location.lng, -20.3);
        assert!(alice.location.last_updated >= before);
    }

    #[tokio::test]
    async fn test_update_broadcasts_to_all_connections() {
        let f = fixture();
        f.store.create("alice", "hash").await.unwrap();
        f.store.create("bob", "hash").await.unwrap();

        let mut alice_rx = connect(&f.registry, "alice").await;
        let mut bob_rx = connect(&f.registry, "bob").await;

        let user = f.service.update_location("alice", 1.0, 2.0).await.unwrap();

        let expected = ServerEvent::LocationUpdate {
            username: "alice".to_string(),
            location: user.location,
        };
        // Every connection hears about it, not just friends.
        assert_eq!(alice_rx.try_recv().unwrap(), expected);
        assert_eq!(bob_rx.try_recv().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_unknown_user_fails_without_broadcast() {
        let f = fixture();
        f.store.create("alice", "hash").await.unwrap();
        let mut alice_rx = connect(&f.registry, "alice").await;

        assert!(matches!(
            f.service.update_location("ghost", 1.0, 2.0).await,
            Err(ApiError::NotFound)
        ));
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_all_locations_lists_every_user() {
        let f = fixture();
        f.store.create("alice", "hash").await.unwrap();
        f.store.create("bob", "hash").await.unwrap();
        f.service.update_location("alice", 3.0, 4.0).await.unwrap();

        let mut locations = f.service.all_locations().await.unwrap();
        locations.sort_by(|a, b| a.username.cmp(&b.username));

        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].username, "alice");
        assert_eq!(locations[0].location.lat, 3.0);
        assert_eq!(locations[1].username, "bob");
        assert_eq!(locations[1].location.lat, 0.0);
    }
}
