//! User records and their activity history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreCacheError};

/// Kind of activity a user performed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// Bought something.
    Purchase,
    /// Wrote a review.
    Review,
    /// Referred another user.
    Referral,
}

impl ActivityKind {
    /// Every activity kind, in declaration order.
    pub const ALL: [ActivityKind; 3] = [
        ActivityKind::Purchase,
        ActivityKind::Review,
        ActivityKind::Referral,
    ];

    /// Lowercase name, as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Purchase => "purchase",
            ActivityKind::Review => "review",
            ActivityKind::Referral => "referral",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timestamped activity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// What the user did
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    /// Points earned by this activity
    pub points: u64,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}

impl Activity {
    /// Creates a new activity.
    pub fn new(kind: ActivityKind, points: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            points,
            timestamp,
        }
    }
}

/// A user record.
///
/// Owned by the user store; the score computation only reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (assigned by the store)
    pub id: u64,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Base points before bonuses
    pub points: u64,
    /// Activity history, oldest first
    pub activities: Vec<Activity>,
}

impl User {
    /// Returns true if the user has at least one activity of the given kind.
    pub fn has_activity(&self, kind: ActivityKind) -> bool {
        self.activities.iter().any(|a| a.kind == kind)
    }

    /// Counts activities strictly newer than `since`.
    pub fn activities_since(&self, since: DateTime<Utc>) -> usize {
        self.activities.iter().filter(|a| a.timestamp > since).count()
    }
}

/// Input for creating a user.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
}

impl NewUser {
    /// Creates a new user request.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Validates the request.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ScoreCacheError::ValidationError("name cannot be empty".into()));
        }
        if !self.email.contains('@') {
            return Err(ScoreCacheError::ValidationError(format!(
                "invalid email: {}",
                self.email
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    fn sample_user() -> User {
        User {
            id: 1,
            name: "John Doe".into(),
            email: "john@example.com".into(),
            points: 100,
            activities: vec![
                Activity::new(ActivityKind::Purchase, 50, at(2024, 1, 1)),
                Activity::new(ActivityKind::Review, 30, at(2024, 1, 15)),
            ],
        }
    }

    #[test]
    fn test_has_activity() {
        let user = sample_user();
        assert!(user.has_activity(ActivityKind::Purchase));
        assert!(user.has_activity(ActivityKind::Review));
        assert!(!user.has_activity(ActivityKind::Referral));
    }

    #[test]
    fn test_activities_since_is_strict() {
        let user = sample_user();
        assert_eq!(user.activities_since(at(2023, 12, 1)), 2);
        assert_eq!(user.activities_since(at(2024, 1, 1)), 1);
        assert_eq!(user.activities_since(at(2024, 1, 15) + Duration::seconds(1)), 0);
    }

    #[test]
    fn test_activity_wire_format() {
        let activity = Activity::new(ActivityKind::Referral, 20, at(2024, 2, 1));
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["type"], "referral");
        assert_eq!(json["points"], 20);
    }

    #[test]
    fn test_new_user_validation() {
        assert!(NewUser::new("Ada", "ada@example.com").validate().is_ok());
        assert!(NewUser::new("  ", "ada@example.com").validate().is_err());
        assert!(NewUser::new("Ada", "not-an-email").validate().is_err());
    }
}
