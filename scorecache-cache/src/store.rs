//! In-memory TTL store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::trace;

use scorecache_core::constants::DEFAULT_TTL;

use crate::clock::{SharedClock, SystemClock};

/// Cache entry with its absolute expiry.
///
/// `expires_at` is `None` when `now + ttl` overflows, i.e. the entry never expires.
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    /// An entry is valid iff `now < expires_at`.
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Cache configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL applied by [`TtlStore::set`]
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
        }
    }
}

impl CacheConfig {
    /// Sets the default TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// The default TTL.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

/// Keyed container of values that expire after a time-to-live.
///
/// Expired entries are removed lazily: [`get`](Self::get) treats them as absent and
/// drops them, and nothing sweeps in the background. Presence is tracked by the
/// entry itself, so any value (including `0` or an empty string) is a valid hit.
///
/// Each operation takes the internal lock for its own duration only.
pub struct TtlStore<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    config: CacheConfig,
    clock: SharedClock,
}

impl<V> TtlStore<V> {
    /// Creates a store with default configuration and the system clock.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a store with custom configuration and the system clock.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a store with custom configuration and time source.
    pub fn with_clock(config: CacheConfig, clock: SharedClock) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            clock,
        }
    }

    /// Stores a value with the default TTL.
    pub fn set(&self, key: &str, value: V) {
        self.set_with_ttl(key, value, self.config.default_ttl());
    }

    /// Stores a value that expires `ttl` from now, replacing any previous entry.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        let expires_at = self.clock.now().checked_add(ttl);
        trace!(key, ?ttl, "Storing cache entry");
        self.entries
            .write()
            .insert(key.to_owned(), CacheEntry { value, expires_at });
    }

    /// Removes a single entry.
    pub fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Removes all expired entries, returning how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// The TTL applied by [`set`](Self::set).
    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl()
    }

    /// Returns store statistics.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.entries.read();
        let expired = entries.values().filter(|e| e.is_expired(now)).count();
        CacheStats {
            total_entries: entries.len(),
            expired_entries: expired,
            valid_entries: entries.len().saturating_sub(expired),
            default_ttl_ms: u64::try_from(self.config.default_ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl<V: Clone> TtlStore<V> {
    /// Gets a value by key.
    ///
    /// Returns `None` if the key was never set or its entry has expired. An expired
    /// entry is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(e) if !e.is_expired(now) => return Some(e.value.clone()),
                Some(_) => {}
            }
        }

        // Expired: re-check under the write lock, a writer may have refreshed it.
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(e) if !e.is_expired(self.clock.now()) => Some(e.value.clone()),
            Some(_) => {
                trace!(key, "Evicting expired cache entry");
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

impl<V> Default for TtlStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries currently held, expired or not
    pub total_entries: usize,
    /// Entries past their expiry that no read has evicted yet
    pub expired_entries: usize,
    /// Entries still servable
    pub valid_entries: usize,
    /// TTL applied by `set`, in milliseconds
    pub default_ttl_ms: u64,
}
