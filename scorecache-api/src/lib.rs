//! # scorecache API Server
//!
//! REST API over the user store and the memoized score service.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness and basic counters
//! - `GET /api/v1/users` - List users
//! - `POST /api/v1/users` - Create a user
//! - `GET /api/v1/users/:id` - Get a user
//! - `GET /api/v1/users/:id/score` - Get a user's score (cached for the TTL)
//! - `GET /api/v1/cache/stats` - Cache and coalescing statistics
//! - `DELETE /api/v1/cache` - Drop every cached score
//!
//! ## Example
//!
//! ```rust,ignore
//! use scorecache_api::{ApiServer, ApiConfig};
//!
//! let server = ApiServer::new(ApiConfig::from_env()?);
//! server.run(([0, 0, 0, 0], 3000)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server for scorecache.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a new API server with the given configuration.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(config)),
        }
    }

    /// Returns the shared state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(
            %addr,
            ttl = ?self.state.config.score.cache.default_ttl,
            "scorecache API server listening"
        );

        axum::serve(listener, self.router()).await
    }
}
