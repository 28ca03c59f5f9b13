//! # scorecache Score
//!
//! The example computation plugged into the coalescer: a user's score is their
//! base points with activity bonuses applied.
//!
//! - [`compute_score`]: the pure formula
//! - [`ScoreService`]: looks users up and memoizes their scores, one computation
//!   per user at a time
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use scorecache_registry::MemoryUserStore;
//! use scorecache_score::{ScoreConfig, ScoreService};
//!
//! let service = ScoreService::new(Arc::new(MemoryUserStore::with_demo_users()), ScoreConfig::default());
//! let result = service.calculate(2).await?;
//! assert_eq!(result.score, 150);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod scoring;
mod service;

pub use scoring::{compute_score, score_breakdown, ScoreBreakdown};
pub use service::{score_cache_key, ScoreConfig, ScoreResult, ScoreService, ScoreServiceStats};
