//! # scorecache Core
//!
//! Core types, errors, and traits shared by every scorecache crate.
//!
//! - **Types**: user records and their activity history
//! - **Errors**: a single cloneable error type that can be fanned out to many waiters
//! - **Constants**: cache and scoring defaults
//! - **Traits**: the user store interface consumed by the score service
//!
//! ## Example
//!
//! ```rust
//! use scorecache_core::{ActivityKind, NewUser};
//!
//! let new_user = NewUser::new("Ada", "ada@example.com");
//! assert!(new_user.validate().is_ok());
//! assert_eq!(ActivityKind::ALL.len(), 3);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, ScoreCacheError};
pub use traits::*;
pub use types::*;
