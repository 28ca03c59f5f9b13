//! User score service.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use scorecache_cache::{
    CacheConfig, CacheStats, Coalescer, CoalescerStats, SharedClock, SystemClock, TtlStore,
};
use scorecache_core::constants::{DEFAULT_COMPUTE_DELAY_MS, USER_SCORE_KEY_PREFIX};
use scorecache_core::error::{Result, ScoreCacheError};
use scorecache_core::traits::UserStore;

use crate::scoring::compute_score;

/// Score service configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Cache settings (TTL)
    pub cache: CacheConfig,
    /// Simulated cost of one computation, in milliseconds
    pub compute_delay_ms: u64,
    /// How long a caller waits for a computation before giving up, if bounded
    pub wait_timeout_ms: Option<u64>,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            compute_delay_ms: DEFAULT_COMPUTE_DELAY_MS,
            wait_timeout_ms: None,
        }
    }
}

impl ScoreConfig {
    /// Sets the cache TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache = self.cache.with_ttl(ttl);
        self
    }

    /// Sets the simulated computation cost.
    pub fn with_compute_delay(mut self, delay: Duration) -> Self {
        self.compute_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Bounds how long a caller waits for a result.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    fn compute_delay(&self) -> Duration {
        Duration::from_millis(self.compute_delay_ms)
    }

    fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_ms.map(Duration::from_millis)
    }
}

/// A user's score and whether it was served from cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// The user
    pub user_id: u64,
    /// The score
    pub score: u64,
    /// `true` if no computation ran for this call
    pub cached: bool,
}

/// Cache and coalescer counters.
#[derive(Clone, Debug, Serialize)]
pub struct ScoreServiceStats {
    /// TTL store contents
    pub cache: CacheStats,
    /// Coalescing activity
    pub coalescer: CoalescerStats,
}

/// Cache key under which a user's score is memoized.
pub fn score_cache_key(user_id: u64) -> String {
    format!("{USER_SCORE_KEY_PREFIX}{user_id}")
}

/// Computes user scores, memoized per user and coalesced across concurrent callers.
#[derive(Clone)]
pub struct ScoreService {
    users: Arc<dyn UserStore>,
    coalescer: Coalescer<u64>,
    config: ScoreConfig,
}

impl ScoreService {
    /// Creates a service using the system clock.
    pub fn new(users: Arc<dyn UserStore>, config: ScoreConfig) -> Self {
        Self::with_clock(users, config, Arc::new(SystemClock))
    }

    /// Creates a service whose cache expiry follows the given clock.
    pub fn with_clock(users: Arc<dyn UserStore>, config: ScoreConfig, clock: SharedClock) -> Self {
        let store = Arc::new(TtlStore::with_clock(config.cache.clone(), clock));
        Self {
            users,
            coalescer: Coalescer::new(store),
            config,
        }
    }

    /// Returns the service configuration.
    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    /// Returns a user's score, computing it at most once per TTL window.
    ///
    /// Fails with [`ScoreCacheError::UserNotFound`] for unknown users; failures are
    /// never cached.
    #[instrument(skip(self))]
    pub async fn calculate(&self, user_id: u64) -> Result<ScoreResult> {
        let users = self.users.clone();
        let delay = self.config.compute_delay();
        let compute = move |_key: String| compute_user_score(users, user_id, delay);

        let key = score_cache_key(user_id);
        let computed = match self.config.wait_timeout() {
            Some(timeout) => {
                self.coalescer
                    .compute_with_timeout(key, timeout, compute)
                    .await?
            }
            None => self.coalescer.compute(key, compute).await?,
        };

        debug!(
            user_id,
            score = computed.value,
            cached = computed.cached,
            "Calculated user score"
        );

        Ok(ScoreResult {
            user_id,
            score: computed.value,
            cached: computed.cached,
        })
    }

    /// Drops one user's cached score.
    pub fn invalidate(&self, user_id: u64) {
        self.coalescer.store().remove(&score_cache_key(user_id));
    }

    /// Drops every cached score.
    pub fn clear_cache(&self) {
        self.coalescer.store().clear();
    }

    /// Number of score computations started so far.
    pub fn computations(&self) -> u64 {
        self.coalescer.stats().computations
    }

    /// Returns cache and coalescer statistics.
    pub fn stats(&self) -> ScoreServiceStats {
        ScoreServiceStats {
            cache: self.coalescer.store().stats(),
            coalescer: self.coalescer.stats(),
        }
    }
}

/// The computation handed to the coalescer.
async fn compute_user_score(
    users: Arc<dyn UserStore>,
    user_id: u64,
    delay: Duration,
) -> Result<u64> {
    let user = users
        .find(user_id)
        .await?
        .ok_or(ScoreCacheError::UserNotFound(user_id))?;

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    Ok(compute_score(&user, Utc::now()))
}
