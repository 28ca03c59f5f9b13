//! Score formula.
//!
//! `score = round(points × active × diverse)` where
//!
//! - `active` is ×1.5 when at least three activities fall within the last 30 days,
//! - `diverse` is ×1.2 when the user has ever done every kind of activity.
//!
//! Multipliers are kept in integer tenths and the product is rounded once, half up,
//! so the result never depends on floating-point representation.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use scorecache_core::constants::{
    ACTIVE_BONUS_TENTHS, ACTIVE_USER_MIN_ACTIVITIES, DIVERSE_BONUS_TENTHS, NO_BONUS_TENTHS,
    RECENT_ACTIVITY_WINDOW_DAYS,
};
use scorecache_core::types::{ActivityKind, User};

/// How a score was derived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    /// Points before bonuses
    pub base_points: u64,
    /// Activities inside the recency window
    pub recent_activities: usize,
    /// Whether the activity bonus applied
    pub active_bonus: bool,
    /// Whether the diversity bonus applied
    pub diverse_bonus: bool,
    /// Final score
    pub score: u64,
}

/// Computes a user's score as of the given instant.
pub fn compute_score(user: &User, as_of: DateTime<Utc>) -> u64 {
    score_breakdown(user, as_of).score
}

/// Computes a user's score and reports which bonuses applied.
pub fn score_breakdown(user: &User, as_of: DateTime<Utc>) -> ScoreBreakdown {
    let since = as_of - Duration::days(RECENT_ACTIVITY_WINDOW_DAYS);
    let recent_activities = user.activities_since(since);
    let active_bonus = recent_activities >= ACTIVE_USER_MIN_ACTIVITIES;
    let diverse_bonus = ActivityKind::ALL.iter().all(|kind| user.has_activity(*kind));

    let active = if active_bonus { ACTIVE_BONUS_TENTHS } else { NO_BONUS_TENTHS };
    let diverse = if diverse_bonus { DIVERSE_BONUS_TENTHS } else { NO_BONUS_TENTHS };

    // points × (active / 10) × (diverse / 10), rounded half up.
    let scaled = u128::from(user.points) * u128::from(active) * u128::from(diverse);
    let score = u64::try_from((scaled + 50) / 100).unwrap_or(u64::MAX);

    ScoreBreakdown {
        base_points: user.points,
        recent_activities,
        active_bonus,
        diverse_bonus,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use scorecache_core::types::Activity;
    use test_case::test_case;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        as_of() - Duration::days(days)
    }

    fn user(points: u64, activities: Vec<Activity>) -> User {
        User {
            id: 1,
            name: "Test".into(),
            email: "test@example.com".into(),
            points,
            activities,
        }
    }

    fn recent(kind: ActivityKind) -> Activity {
        Activity::new(kind, 10, days_ago(1))
    }

    fn old(kind: ActivityKind) -> Activity {
        Activity::new(kind, 10, days_ago(90))
    }

    use ActivityKind::{Purchase, Referral, Review};

    #[test_case(100, vec![], 100 ; "no activities")]
    #[test_case(100, vec![recent(Purchase), recent(Purchase), recent(Purchase)], 150 ; "active only")]
    #[test_case(100, vec![old(Purchase), old(Review), old(Referral)], 120 ; "diverse only")]
    #[test_case(100, vec![recent(Purchase), recent(Review), recent(Referral)], 180 ; "active and diverse")]
    #[test_case(150, vec![old(Purchase), old(Review)], 150 ; "two kinds is not diverse")]
    #[test_case(0, vec![recent(Purchase), recent(Review), recent(Referral)], 0 ; "zero points")]
    fn test_score(points: u64, activities: Vec<Activity>, expected: u64) {
        assert_eq!(compute_score(&user(points, activities), as_of()), expected);
    }

    #[test_case(5, true, false, 8 ; "7.5 rounds up")]
    #[test_case(7, false, true, 8 ; "8.4 rounds down")]
    #[test_case(1, true, true, 2 ; "1.8 rounds up")]
    #[test_case(3, false, true, 4 ; "3.6 rounds up")]
    #[test_case(25, true, true, 45 ; "exact product")]
    fn test_rounding(points: u64, active: bool, diverse: bool, expected: u64) {
        let mut activities = Vec::new();
        if active {
            activities.extend([recent(Purchase), recent(Purchase), recent(Purchase)]);
        }
        if diverse {
            activities.extend([old(Purchase), old(Review), old(Referral)]);
        }
        assert_eq!(compute_score(&user(points, activities), as_of()), expected);
    }

    #[test]
    fn test_recency_window_is_exclusive() {
        let boundary = Activity::new(Purchase, 10, days_ago(RECENT_ACTIVITY_WINDOW_DAYS));
        let u = user(
            100,
            vec![boundary, recent(Purchase), recent(Purchase)],
        );
        let breakdown = score_breakdown(&u, as_of());
        assert_eq!(breakdown.recent_activities, 2);
        assert!(!breakdown.active_bonus);
        assert_eq!(breakdown.score, 100);
    }

    #[test]
    fn test_breakdown_reports_bonuses() {
        let u = user(100, vec![recent(Purchase), recent(Review), recent(Referral)]);
        let breakdown = score_breakdown(&u, as_of());
        assert_eq!(
            breakdown,
            ScoreBreakdown {
                base_points: 100,
                recent_activities: 3,
                active_bonus: true,
                diverse_bonus: true,
                score: 180,
            }
        );
    }

    #[test]
    fn test_huge_points_saturate() {
        let u = user(u64::MAX, vec![recent(Purchase), recent(Review), recent(Referral)]);
        assert_eq!(compute_score(&u, as_of()), u64::MAX);
    }

    proptest! {
        #[test]
        fn prop_score_bounded_by_bonuses(points in 0u64..1_000_000_000, active in any::<bool>(), diverse in any::<bool>()) {
            let mut activities = Vec::new();
            if active {
                activities.extend([recent(Purchase), recent(Purchase), recent(Purchase)]);
            }
            if diverse {
                activities.extend([old(Purchase), old(Review), old(Referral)]);
            }
            let score = compute_score(&user(points, activities), as_of());
            prop_assert!(score >= points);
            prop_assert!(score <= points * 18 / 10 + 1);
        }
    }
}
