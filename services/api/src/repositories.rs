//! User document store
//!
//! The store contract is document-style: find, create, update-location and
//! a whole-document save for the friend/request arrays. Every operation is
//! atomic per document; there is no multi-document transaction guarantee,
//! so callers performing paired saves are written to be idempotent under
//! retry.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::User;

pub mod memory;
pub mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

/// Document-style access to persisted user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by their unique username
    async fn find_by_username(&self, username: &str) -> ApiResult<Option<User>>;

    /// Resolve a set of user ids; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[Uuid]) -> ApiResult<Vec<User>>;

    /// All users, for the shared map view
    async fn all(&self) -> ApiResult<Vec<User>>;

    /// Create a user with an unset location and a hashed credential; fails
    /// with `DuplicateUsername` when the name is taken
    async fn create(&self, username: &str, password_hash: &str) -> ApiResult<User>;

    /// Persist new coordinates and refresh the location timestamp; fails
    /// with `NotFound` for an unknown username
    async fn update_location(&self, username: &str, lat: f64, lng: f64) -> ApiResult<User>;

    /// Persist the friend and pending-request arrays of a mutated document
    async fn save(&self, user: &User) -> ApiResult<()>;
}
