//! App state: user store, score service, config.

use std::sync::Arc;
use std::time::{Duration, Instant};

use scorecache_core::error::{Result, ScoreCacheError};
use scorecache_registry::MemoryUserStore;
use scorecache_score::{ScoreConfig, ScoreService};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Score service and cache settings
    pub score: ScoreConfig,
    /// Whether to start with the demo users
    pub seed_demo_users: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            score: ScoreConfig::default(),
            seed_demo_users: true,
        }
    }
}

impl ApiConfig {
    /// Reads configuration from the environment (and `.env`, if present).
    ///
    /// - `SCORECACHE_TTL_SECONDS`: cache TTL
    /// - `SCORECACHE_COMPUTE_DELAY_MS`: simulated cost per computation
    /// - `SCORECACHE_WAIT_TIMEOUT_MS`: how long a request waits for a computation
    /// - `SCORECACHE_SEED_DEMO`: `false` or `0` to start with no users
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();
        if let Some(ttl) = env_u64("SCORECACHE_TTL_SECONDS")? {
            config.score = config.score.with_ttl(Duration::from_secs(ttl));
        }
        if let Some(delay) = env_u64("SCORECACHE_COMPUTE_DELAY_MS")? {
            config.score = config.score.with_compute_delay(Duration::from_millis(delay));
        }
        if let Some(timeout) = env_u64("SCORECACHE_WAIT_TIMEOUT_MS")? {
            config.score = config.score.with_wait_timeout(Duration::from_millis(timeout));
        }
        config.seed_demo_users = std::env::var("SCORECACHE_SEED_DEMO")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Ok(config)
    }
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| {
            ScoreCacheError::ConfigError(format!("{name} must be a non-negative integer, got '{raw}'"))
        }),
        Err(_) => Ok(None),
    }
}

/// Shared state behind every handler.
pub struct AppState {
    /// Active configuration
    pub config: ApiConfig,
    /// User records
    pub users: Arc<MemoryUserStore>,
    /// Memoized scores
    pub scores: ScoreService,
    /// When the state was built
    pub started_at: Instant,
}

impl AppState {
    /// Builds the state from configuration.
    pub fn new(config: ApiConfig) -> Self {
        let users = Arc::new(if config.seed_demo_users {
            MemoryUserStore::with_demo_users()
        } else {
            MemoryUserStore::new()
        });
        let scores = ScoreService::new(users.clone(), config.score.clone());

        Self {
            config,
            users,
            scores,
            started_at: Instant::now(),
        }
    }
}
