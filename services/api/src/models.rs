//! User model and request/response payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Geographic position of a user, refreshed on every location update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub last_updated: DateTime<Utc>,
}

impl Location {
    /// Unset position assigned to newly registered users
    pub fn unset() -> Self {
        Self {
            lat: 0.0,
            lng: 0.0,
            last_updated: Utc::now(),
        }
    }
}

/// User document
///
/// `friends` is kept symmetric: after an accept completes, both sides
/// reference each other. `friend_requests` holds the ids of users with a
/// pending inbound request. The credential hash is never serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub location: Location,
    pub friends: Vec<Uuid>,
    pub friend_requests: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for user registration
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for user login
#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub username: String,
}

/// Username plus current position, as shown on the shared map
#[derive(Debug, Clone, Serialize)]
pub struct UserLocation {
    pub username: String,
    pub location: Location,
}

/// Pending friend request entry
#[derive(Debug, Clone, Serialize)]
pub struct PendingRequest {
    pub username: String,
    #[serde(rename = "_id")]
    pub id: Uuid,
}

/// Request to send a friend request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFriendRequestRequest {
    pub my_username: String,
    pub friend_username: String,
}

/// Request to accept a pending friend request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptFriendRequestRequest {
    pub my_username: String,
    pub requester_username: String,
}

/// Request to update a user's position
#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub username: String,
    pub lat: f64,
    pub lng: f64,
}

/// Generic message-only response
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response for a location update, echoing the persisted document
#[derive(Serialize)]
pub struct UpdateLocationResponse {
    pub message: String,
    pub user: User,
}
