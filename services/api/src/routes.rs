//! User-facing routes: registration, login, the shared map, and the
//! friendship endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tracing::info;

use crate::{
    error::ApiError,
    models::{
        AcceptFriendRequestRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
        SendFriendRequestRequest, UpdateLocationRequest, UpdateLocationResponse,
    },
    password, realtime,
    state::AppState,
    validation,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/all", get(all_users))
        .route("/friends/:username", get(friends))
        .route("/send-friend-request", post(send_friend_request))
        .route("/accept-friend-request", post(accept_friend_request))
        .route("/friend-requests/:username", get(friend_requests))
        .route("/update-location", put(update_location))
        .route("/ws", get(realtime::ws_handler))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}

/// Register a new user with a hashed credential
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::validate_username(&payload.username).map_err(ApiError::Validation)?;
    validation::validate_password(&payload.password).map_err(ApiError::Validation)?;

    let password_hash = password::hash_password(&payload.password).map_err(ApiError::Store)?;
    state.store.create(&payload.username, &password_hash).await?;

    info!(username = %payload.username, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// Log a user in by checking the stored credential
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .find_by_username(&payload.username)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !password::verify_password(&user.password_hash, &payload.password)
        .map_err(ApiError::Store)?
    {
        return Err(ApiError::BadCredential);
    }

    info!(username = %user.username, "Login successful");
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        username: user.username,
    }))
}

/// Every user with their current position
pub async fn all_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.location.all_locations().await?;
    Ok(Json(users))
}

/// A user's friends with their positions
pub async fn friends(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let friends = state.friendship.friends_of(&username).await?;
    Ok(Json(friends))
}

/// Send a friend request and notify the recipient
pub async fn send_friend_request(
    State(state): State<AppState>,
    Json(payload): Json<SendFriendRequestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .friendship
        .send_request(&payload.my_username, &payload.friend_username)
        .await?;

    Ok(Json(MessageResponse {
        message: "Friend request sent!".to_string(),
    }))
}

/// Accept a pending friend request
pub async fn accept_friend_request(
    State(state): State<AppState>,
    Json(payload): Json<AcceptFriendRequestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .friendship
        .accept_request(&payload.my_username, &payload.requester_username)
        .await?;

    Ok(Json(MessageResponse {
        message: "Friendship accepted successfully!".to_string(),
    }))
}

/// Pending friend requests for a user
pub async fn friend_requests(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state.friendship.pending_requests(&username).await?;
    Ok(Json(requests))
}

/// Update a user's position and broadcast it
pub async fn update_location(
    State(state): State<AppState>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .location
        .update_location(&payload.username, payload.lat, payload.lng)
        .await?;

    Ok(Json(UpdateLocationResponse {
        message: "Location updated successfully".to_string(),
        user,
    }))
}
