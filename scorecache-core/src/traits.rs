//! Common traits for scorecache.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{NewUser, User};

// ═══════════════════════════════════════════════════════════════════════════════
// USER STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for user record storage.
///
/// The score service only needs `find`; the rest backs the user endpoints.
/// Implementations must be safe to call concurrently.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks up a user by id. Returns `Ok(None)` when no such user exists.
    async fn find(&self, id: u64) -> Result<Option<User>>;

    /// Returns every user, ordered by id.
    async fn all(&self) -> Result<Vec<User>>;

    /// Creates a user with zero points and no activities.
    ///
    /// Returns the stored record, including its assigned id.
    async fn create(&self, new_user: NewUser) -> Result<User>;

    /// Returns the number of stored users.
    async fn count(&self) -> Result<u64>;
}
