//! TTL cache with request coalescing.
//!
//! - [`TtlStore`]: keyed values with lazy, read-time expiry
//! - [`Coalescer`]: runs at most one computation per key at a time and memoizes
//!   successful results in a shared [`TtlStore`]
//! - [`Clock`]: injectable time source, with [`ManualClock`] for tests
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use scorecache_cache::{Coalescer, TtlStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> scorecache_core::Result<()> {
//! let coalescer: Coalescer<u64> = Coalescer::new(Arc::new(TtlStore::new()));
//!
//! let first = coalescer.compute("score-1", |_key| async { Ok(150) }).await?;
//! assert!(!first.cached);
//!
//! let second = coalescer.compute("score-1", |_key| async { Ok(0) }).await?;
//! assert_eq!((second.value, second.cached), (150, true));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod clock;
mod coalesce;
mod store;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use coalesce::{Coalescer, CoalescerStats, Computed};
pub use store::{CacheConfig, CacheStats, TtlStore};
