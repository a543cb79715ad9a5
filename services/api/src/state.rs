//! Application state shared across handlers

use std::sync::Arc;

use crate::friendship::FriendshipService;
use crate::location::LocationService;
use crate::notify::Notifier;
use crate::presence::PresenceRegistry;
use crate::repositories::UserStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub presence: Arc<PresenceRegistry>,
    pub friendship: FriendshipService,
    pub location: LocationService,
}

impl AppState {
    /// Wire the services around a store and a fresh presence registry
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        let notifier = Notifier::new(presence.clone());
        let friendship = FriendshipService::new(store.clone(), notifier.clone());
        let location = LocationService::new(store.clone(), notifier);

        Self {
            store,
            presence,
            friendship,
            location,
        }
    }
}
