//! Domain types for scorecache.
//!
//! - [`User`]: a scored record with its base points and activity history
//! - [`Activity`]: a timestamped, typed event contributing to a user's profile
//! - [`NewUser`]: the input accepted when creating a user

mod user;

pub use user::*;
