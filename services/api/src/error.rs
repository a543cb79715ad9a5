//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Custom error type for the API service
///
/// Every store or validation failure is surfaced as one of these variants
/// at the request boundary; none are retried.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Unknown username in any lookup
    #[error("User not found")]
    NotFound,

    /// Registration conflict on an existing username
    #[error("Username already exists")]
    DuplicateUsername,

    /// Login credential mismatch
    #[error("Incorrect password")]
    BadCredential,

    /// A pending request from the same requester already exists
    #[error("Friend request already sent")]
    AlreadyRequested,

    /// The two users are already mutual friends
    #[error("Users are already friends")]
    AlreadyFriends,

    /// Rejected request payload
    #[error("{0}")]
    Validation(String),

    /// Underlying persistence failure, opaque cause
    #[error("Store failure: {0}")]
    Store(#[source] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Store(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::DuplicateUsername => StatusCode::CONFLICT,
            ApiError::BadCredential => StatusCode::UNAUTHORIZED,
            ApiError::AlreadyRequested | ApiError::AlreadyFriends | ApiError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            // Keep the backend cause out of client responses.
            ApiError::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::DuplicateUsername.into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::BadCredential.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::AlreadyRequested.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::AlreadyFriends.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Store(anyhow::anyhow!("boom")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
