//! API route handlers.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{StatusCode, Uri},
    Json,
};
use tracing::{debug, info};

use scorecache_core::error::ScoreCacheError;
use scorecache_core::traits::UserStore;
use scorecache_core::types::{NewUser, User};
use scorecache_score::ScoreServiceStats;

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>> {
    let users_count = state.users.count().await?;

    Ok(Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        users_count,
        computations_in_flight: state.scores.stats().coalescer.in_flight,
    }))
}

/// GET /api/v1/users
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>> {
    Ok(Json(state.users.all().await?))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>)> {
    let Json(req) = payload?;
    let user = state.users.create(NewUser::from(req)).await?;

    info!(user_id = user.id, "Created user");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    id: std::result::Result<Path<u64>, PathRejection>,
) -> Result<Json<User>> {
    let Path(id) = id?;
    state
        .users
        .find(id)
        .await?
        .map(Json)
        .ok_or_else(|| ScoreCacheError::UserNotFound(id).into())
}

/// GET /api/v1/users/:id/score
pub async fn get_user_score(
    State(state): State<Arc<AppState>>,
    id: std::result::Result<Path<u64>, PathRejection>,
) -> Result<Json<ScoreResponse>> {
    let Path(id) = id?;
    let result = state.scores.calculate(id).await?;

    debug!(user_id = id, cached = result.cached, "Served user score");
    Ok(Json(result.into()))
}

/// GET /api/v1/cache/stats
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<ScoreServiceStats> {
    Json(state.scores.stats())
}

/// DELETE /api/v1/cache
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    state.scores.clear_cache();

    info!("Cleared score cache");
    StatusCode::NO_CONTENT
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ScoreCacheError::NotFound(format!("no route for {}", uri.path())).into()
}
