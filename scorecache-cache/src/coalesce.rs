//! Request coalescing in front of a [`TtlStore`].
//!
//! [`Coalescer::compute`] returns a fresh cached value when there is one. Otherwise
//! it makes sure exactly one computation per key is in flight and hands its result,
//! or its error, to every caller that asked for that key in the meantime.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, warn};

use scorecache_core::error::{Result, ScoreCacheError};

use crate::store::TtlStore;

type ComputationChannel<V> = Shared<oneshot::Receiver<Result<V>>>;

type ComputationMap<V> = Arc<Mutex<HashMap<String, ComputationChannel<V>>>>;

/// A value produced by [`Coalescer::compute`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Computed<V> {
    /// The value
    pub value: V,
    /// `true` if it was served from the store without running anything
    pub cached: bool,
}

/// Outcome of the claim step.
enum Claim<V> {
    Hit(V),
    Wait(ComputationChannel<V>),
}

/// Runs a closure when dropped, including during unwinding.
struct CallOnDrop {
    f: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl CallOnDrop {
    fn new<F: FnOnce() + Send + 'static>(f: F) -> CallOnDrop {
        CallOnDrop {
            f: Some(Box::new(f)),
        }
    }
}

impl Drop for CallOnDrop {
    fn drop(&mut self) {
        if let Some(f) = self.f.take() {
            f();
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    computations: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
    cancelled: AtomicU64,
}

/// Snapshot of coalescer activity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoalescerStats {
    /// Calls answered from the store
    pub hits: u64,
    /// Computations started (one per leader)
    pub computations: u64,
    /// Calls that attached to an in-flight computation
    pub coalesced: u64,
    /// Computations that returned an error or panicked
    pub failures: u64,
    /// Waits abandoned by a timeout
    pub cancelled: u64,
    /// Computations currently running
    pub in_flight: usize,
}

/// Deduplicates concurrent computations of the same key and memoizes their
/// successful results in a [`TtlStore`].
///
/// Per key the state moves `Absent → Pending → Cached | Failed`. `Cached` decays
/// back to `Absent` when the entry expires, `Failed` does so immediately: errors
/// are never stored.
///
/// The first caller to miss for a key (the leader) spawns the computation on the
/// tokio runtime; every caller, the leader's included, then waits on a shared
/// completion channel. Dropping any caller's future therefore never cancels the
/// computation or disturbs other waiters. `compute` must be polled from within a
/// tokio runtime.
///
/// The coalescer is the only writer of the keys it computes. A direct
/// [`TtlStore::set`] on a key whose computation is in flight is a tolerated race:
/// waiters still receive the computed value, and the computed value overwrites
/// the direct write when the computation finishes.
pub struct Coalescer<V> {
    store: Arc<TtlStore<V>>,
    ttl: Duration,
    current_computations: ComputationMap<V>,
    counters: Arc<Counters>,
}

impl<V> Clone for Coalescer<V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ttl: self.ttl,
            current_computations: self.current_computations.clone(),
            counters: self.counters.clone(),
        }
    }
}

impl<V> Coalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a coalescer writing results with the store's default TTL.
    pub fn new(store: Arc<TtlStore<V>>) -> Self {
        let ttl = store.default_ttl();
        Self::with_ttl(store, ttl)
    }

    /// Creates a coalescer writing results with the given TTL.
    pub fn with_ttl(store: Arc<TtlStore<V>>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            current_computations: Arc::new(Mutex::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<TtlStore<V>> {
        &self.store
    }

    /// Number of computations currently in flight.
    pub fn in_flight(&self) -> usize {
        self.current_computations.lock().len()
    }

    /// Returns activity counters.
    pub fn stats(&self) -> CoalescerStats {
        CoalescerStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            computations: self.counters.computations.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            cancelled: self.counters.cancelled.load(Ordering::Relaxed),
            in_flight: self.in_flight(),
        }
    }

    /// Returns the cached value for `key`, or computes it with `f`.
    ///
    /// `f` is invoked at most once across all concurrent callers for `key`, and
    /// not at all on a cache hit. Every caller that did not hit the cache receives
    /// the same value (or the same error) with `cached == false`. Errors are
    /// returned verbatim and never cached.
    ///
    /// If `f` panics while building or running its future, every waiter receives
    /// [`ScoreCacheError::ComputationFailed`] and the key returns to absent.
    pub async fn compute<F, Fut>(&self, key: impl Into<String>, f: F) -> Result<Computed<V>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let key = key.into();
        match self.claim(&key, f) {
            Claim::Hit(value) => Ok(Computed {
                value,
                cached: true,
            }),
            Claim::Wait(channel) => {
                let value = Self::receive(&key, channel.await)?;
                Ok(Computed {
                    value,
                    cached: false,
                })
            }
        }
    }

    /// Like [`compute`](Self::compute), but stops waiting after `timeout`.
    ///
    /// Giving up returns [`ScoreCacheError::Cancelled`] to this caller only: the
    /// computation keeps running and still populates the store for later callers.
    pub async fn compute_with_timeout<F, Fut>(
        &self,
        key: impl Into<String>,
        timeout: Duration,
        f: F,
    ) -> Result<Computed<V>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let key = key.into();
        match self.claim(&key, f) {
            Claim::Hit(value) => Ok(Computed {
                value,
                cached: true,
            }),
            Claim::Wait(channel) => match tokio::time::timeout(timeout, channel).await {
                Ok(received) => {
                    let value = Self::receive(&key, received)?;
                    Ok(Computed {
                        value,
                        cached: false,
                    })
                }
                Err(_elapsed) => {
                    self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, ?timeout, "Stopped waiting for computation");
                    Err(ScoreCacheError::Cancelled(format!(
                        "gave up waiting for '{key}' after {timeout:?}"
                    )))
                }
            },
        }
    }

    /// The single decision point: hit, join, or lead.
    ///
    /// The store is re-checked while holding the registry lock. A leader writes the
    /// store before it deregisters, so a miss with no registry entry means nothing
    /// is in flight and it is safe to start a new computation.
    fn claim<F, Fut>(&self, key: &str, f: F) -> Claim<V>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        if let Some(value) = self.store.get(key) {
            return self.hit(key, value);
        }

        let (sender, channel) = {
            let mut current_computations = self.current_computations.lock();
            if let Some(value) = self.store.get(key) {
                return self.hit(key, value);
            }
            if let Some(channel) = current_computations.get(key) {
                self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Joining in-flight computation");
                return Claim::Wait(channel.clone());
            }

            let (sender, receiver) = oneshot::channel();
            let channel = receiver.shared();
            let evicted = current_computations.insert(key.to_owned(), channel.clone());
            debug_assert!(evicted.is_none());
            (sender, channel)
        };

        self.counters.computations.fetch_add(1, Ordering::Relaxed);
        debug!(key, "Starting computation");
        self.spawn_computation(key.to_owned(), sender, f);
        Claim::Wait(channel)
    }

    fn hit(&self, key: &str, value: V) -> Claim<V> {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        debug!(key, "Cache hit");
        Claim::Hit(value)
    }

    /// Runs `f` on the runtime, then stores, publishes, and deregisters.
    ///
    /// A panic in `f` itself is reported to waiters like one inside its future.
    fn spawn_computation<F, Fut>(&self, key: String, sender: oneshot::Sender<Result<V>>, f: F)
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let current_computations = self.current_computations.clone();
        let token_key = key.clone();
        let remove_computation_token = CallOnDrop::new(move || {
            current_computations.lock().remove(&token_key);
        });

        let computation = match std::panic::catch_unwind(AssertUnwindSafe(|| f(key.clone()))) {
            Ok(computation) => computation,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(key = %key, panic = %message, "Computation panicked before starting");
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                sender
                    .send(Err(ScoreCacheError::ComputationFailed(format!(
                        "computation for '{key}' panicked: {message}"
                    ))))
                    .ok();
                drop(remove_computation_token);
                return;
            }
        };
        let store = self.store.clone();
        let ttl = self.ttl;
        let counters = self.counters.clone();

        tokio::spawn(async move {
            let result = match AssertUnwindSafe(computation).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(key = %key, panic = %message, "Computation panicked");
                    Err(ScoreCacheError::ComputationFailed(format!(
                        "computation for '{key}' panicked: {message}"
                    )))
                }
            };

            match &result {
                Ok(value) => store.set_with_ttl(&key, value.clone(), ttl),
                Err(err) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    if err.is_recoverable() {
                        warn!(key = %key, error = %err, "Computation failed, not caching");
                    } else {
                        debug!(key = %key, error = %err, "Computation rejected, not caching");
                    }
                }
            }

            // Publish before deregistering: anyone who joined the channel gets this
            // result, anyone arriving after removal sees the store.
            sender.send(result).ok();
            drop(remove_computation_token);
        });
    }

    fn receive(
        key: &str,
        received: std::result::Result<Result<V>, oneshot::Canceled>,
    ) -> Result<V> {
        match received {
            Ok(result) => result,
            Err(oneshot::Canceled) => Err(ScoreCacheError::ComputationFailed(format!(
                "computation for '{key}' was dropped before completing"
            ))),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
