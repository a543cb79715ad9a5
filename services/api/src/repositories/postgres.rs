//! PostgreSQL-backed user store

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Location, User};
use crate::repositories::UserStore;

/// User store backed by the `users` table
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new store over a connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        location: Location {
            lat: row.get("lat"),
            lng: row.get("lng"),
            last_updated: row.get("location_updated_at"),
        },
        friends: row.get("friends"),
        friend_requests: row.get("friend_requests"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, lat, lng, location_updated_at,
                   friends, friend_requests, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| user_from_row(&row)))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> ApiResult<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, password_hash, lat, lng, location_updated_at,
                   friends, friend_requests, created_at, updated_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn all(&self) -> ApiResult<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, password_hash, lat, lng, location_updated_at,
                   friends, friend_requests, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn create(&self, username: &str, password_hash: &str) -> ApiResult<User> {
        info!("Creating new user: {}", username);

        if self.find_by_username(username).await?.is_some() {
            return Err(ApiError::DuplicateUsername);
        }

        let row = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, lat, lng, location_updated_at,
                      friends, friend_requests, created_at, updated_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            // The unique constraint closes the race the pre-check leaves open.
            sqlx::Error::Database(db) if db.is_unique_violation() => ApiError::DuplicateUsername,
            _ => ApiError::from(e),
        })?;

        Ok(user_from_row(&row))
    }

    async fn update_location(&self, username: &str, lat: f64, lng: f64) -> ApiResult<User> {
        let row = sqlx::query(
            r#"
            UPDATE users
            SET lat = $2, lng = $3, location_updated_at = NOW(), updated_at = NOW()
            WHERE username = $1
            RETURNING id, username, password_hash, lat, lng, location_updated_at,
                      friends, friend_requests, created_at, updated_at
            "#,
        )
        .bind(username)
        .bind(lat)
        .bind(lng)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| user_from_row(&row)).ok_or(ApiError::NotFound)
    }

    async fn save(&self, user: &User) -> ApiResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET friends = $2, friend_requests = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.friends)
        .bind(&user.friend_requests)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
