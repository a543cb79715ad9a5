//! In-memory user store
//!
//! Keeps user documents in a process-local map behind the same contract as
//! the PostgreSQL store, with the same per-document atomicity. The unit
//! tests run against this implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Location, User};
use crate::repositories::UserStore;

/// User store keyed by username
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> ApiResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|user| ids.contains(&user.id))
            .cloned()
            .collect())
    }

    async fn all(&self) -> ApiResult<Vec<User>> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn create(&self, username: &str, password_hash: &str) -> ApiResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(ApiError::DuplicateUsername);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            location: Location::unset(),
            friends: Vec::new(),
            friend_requests: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        users.insert(username.to_string(), user.clone());

        Ok(user)
    }

    async fn update_location(&self, username: &str, lat: f64, lng: f64) -> ApiResult<User> {
        let mut users = self.users.write().await;
        let user = users.get_mut(username).ok_or(ApiError::NotFound)?;

        user.location = Location {
            lat,
            lng,
            last_updated: Utc::now(),
        };
        user.updated_at = user.location.last_updated;

        Ok(user.clone())
    }

    async fn save(&self, user: &User) -> ApiResult<()> {
        let mut users = self.users.write().await;
        let stored = users.get_mut(&user.username).ok_or(ApiError::NotFound)?;

        stored.friends = user.friends.clone();
        stored.friend_requests = user.friend_requests.clone();
        stored.updated_at = Utc::now();

        Ok(())
    }
}
