//! Defaults for caching and scoring.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default time-to-live for cached results, in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 60;

/// Default time-to-live for cached results.
pub const DEFAULT_TTL: Duration = Duration::from_secs(DEFAULT_TTL_SECONDS);

/// Prefix of the cache key under which a user's score is memoized.
pub const USER_SCORE_KEY_PREFIX: &str = "user-score-";

// ═══════════════════════════════════════════════════════════════════════════════
// SCORING
// ═══════════════════════════════════════════════════════════════════════════════

/// Simulated cost of one score computation, in milliseconds.
pub const DEFAULT_COMPUTE_DELAY_MS: u64 = 1000;

/// Activities newer than this many days count towards the activity bonus.
pub const RECENT_ACTIVITY_WINDOW_DAYS: i64 = 30;

/// Minimum number of recent activities for the activity bonus.
pub const ACTIVE_USER_MIN_ACTIVITIES: usize = 3;

/// Activity bonus multiplier, in tenths (×1.5).
pub const ACTIVE_BONUS_TENTHS: u64 = 15;

/// Diversity bonus multiplier, in tenths (×1.2).
pub const DIVERSE_BONUS_TENTHS: u64 = 12;

/// Neutral multiplier, in tenths (×1.0).
pub const NO_BONUS_TENTHS: u64 = 10;
