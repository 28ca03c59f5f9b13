//! Error types for scorecache.
//!
//! The error type is `Clone`: a single failed computation is delivered, unchanged,
//! to every caller that was waiting on it.

use thiserror::Error;

/// Result type alias using `ScoreCacheError`.
pub type Result<T> = std::result::Result<T, ScoreCacheError>;

/// Main error type for all scorecache operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScoreCacheError {
    // ═══════════════════════════════════════════════════════════════════════════
    // LOOKUP ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The input referenced by a computation does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No user with the given id.
    #[error("User not found: {0}")]
    UserNotFound(u64),

    // ═══════════════════════════════════════════════════════════════════════════
    // COMPUTATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The computation function failed or panicked.
    #[error("Computation failed: {0}")]
    ComputationFailed(String),

    /// A caller stopped waiting for a result.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ScoreCacheError {
    /// Returns true if the referenced input does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ScoreCacheError::NotFound(_) | ScoreCacheError::UserNotFound(_)
        )
    }

    /// Returns true if retrying the same call may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScoreCacheError::ComputationFailed(_) | ScoreCacheError::Cancelled(_)
        )
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            ScoreCacheError::ValidationError(_) | ScoreCacheError::JsonError(_)
        )
    }
}

impl From<serde_json::Error> for ScoreCacheError {
    fn from(err: serde_json::Error) -> Self {
        ScoreCacheError::JsonError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_error_display() {
        let err = ScoreCacheError::UserNotFound(999);
        assert_eq!(err.to_string(), "User not found: 999");
    }

    #[test_case(ScoreCacheError::NotFound("x".into()), true, false ; "generic not found")]
    #[test_case(ScoreCacheError::UserNotFound(1), true, false ; "user not found")]
    #[test_case(ScoreCacheError::ComputationFailed("boom".into()), false, true ; "computation failed")]
    #[test_case(ScoreCacheError::Cancelled("timeout".into()), false, true ; "cancelled")]
    #[test_case(ScoreCacheError::ValidationError("bad".into()), false, false ; "validation")]
    fn test_error_classification(err: ScoreCacheError, not_found: bool, recoverable: bool) {
        assert_eq!(err.is_not_found(), not_found);
        assert_eq!(err.is_recoverable(), recoverable);
    }

    #[test]
    fn test_clone_is_identical() {
        let err = ScoreCacheError::ComputationFailed("database unavailable".into());
        assert_eq!(err.clone(), err);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let result: Result<serde_json::Value> = json_result.map_err(ScoreCacheError::from);
        assert!(matches!(result, Err(ScoreCacheError::JsonError(_))));
    }
}
