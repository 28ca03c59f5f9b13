//! DTOs for API requests and responses.

use serde::{Deserialize, Serialize};
use scorecache_core::types::NewUser;
use scorecache_score::ScoreResult;

/// Request to create a user.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        NewUser::new(req.name, req.email)
    }
}

/// Response for a score lookup.
#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    /// The user
    pub user_id: u64,
    /// The score
    pub score: u64,
    /// Whether it was served from cache
    pub cached: bool,
}

impl From<ScoreResult> for ScoreResponse {
    fn from(result: ScoreResult) -> Self {
        Self {
            user_id: result.user_id,
            score: result.score,
            cached: result.cached,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status
    pub status: String,
    /// Version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Number of users in the store
    pub users_count: u64,
    /// Score computations currently running
    pub computations_in_flight: usize,
}
