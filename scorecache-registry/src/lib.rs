//! # scorecache Registry
//!
//! User record storage for the score service.
//!
//! - **Memory**: thread-safe in-memory store, optionally seeded with demo users
//!
//! ## Example
//!
//! ```rust,ignore
//! use scorecache_registry::{MemoryUserStore, UserStore};
//!
//! let store = MemoryUserStore::with_demo_users();
//! let john = store.find(1).await?.expect("seeded");
//! assert_eq!(john.name, "John Doe");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod memory;

pub use memory::MemoryUserStore;

// Re-export the trait from core
pub use scorecache_core::traits::UserStore;
