//! In-memory user store.
//!
//! Thread-safe storage suitable for development, testing, and single-process
//! deployments. Nothing survives a restart.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dashmap::DashMap;
use tracing::{debug, instrument};

use scorecache_core::error::{Result, ScoreCacheError};
use scorecache_core::traits::UserStore;
use scorecache_core::types::{Activity, ActivityKind, NewUser, User};

/// In-memory user store.
///
/// Ids are assigned sequentially starting at 1.
#[derive(Debug)]
pub struct MemoryUserStore {
    /// Primary storage: ID → User
    users: DashMap<u64, User>,
    /// Next user ID
    next_id: AtomicU64,
}

impl MemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates a store seeded with the two demo users (ids 1 and 2).
    pub fn with_demo_users() -> Self {
        let store = Self::new();
        for user in demo_users() {
            store.insert(user);
        }
        store
    }

    /// Inserts or replaces a user under its own id.
    ///
    /// Later calls to `create` never reuse an id at or below an inserted one.
    pub fn insert(&self, user: User) {
        self.next_id.fetch_max(user.id.saturating_add(1), Ordering::SeqCst);
        self.users.insert(user.id, user);
    }

    /// Appends an activity to a user's history.
    pub fn add_activity(&self, id: u64, activity: Activity) -> Result<()> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or(ScoreCacheError::UserNotFound(id))?;
        user.activities.push(activity);
        Ok(())
    }

    /// Removes all users and resets id assignment.
    pub fn clear(&self) {
        self.users.clear();
        self.next_id.store(1, Ordering::SeqCst);
    }

    /// Returns the number of users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    #[instrument(skip(self))]
    async fn find(&self, id: u64) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.clone()))
    }

    async fn all(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    #[instrument(skip(self, new_user), fields(name = %new_user.name))]
    async fn create(&self, new_user: NewUser) -> Result<User> {
        new_user.validate()?;

        let id = self
            .next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| id.checked_add(1))
            .map_err(|_| ScoreCacheError::InternalError("user id space exhausted".into()))?;
        let user = User {
            id,
            name: new_user.name,
            email: new_user.email,
            points: 0,
            activities: Vec::new(),
        };

        debug!(id, "Creating user");
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.users.len() as u64)
    }
}

/// The two users every fresh demo deployment starts with.
fn demo_users() -> Vec<User> {
    let day = |year, month, day| {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .unwrap_or_default()
    };

    vec![
        User {
            id: 1,
            name: "John Doe".into(),
            email: "john@example.com".into(),
            points: 100,
            activities: vec![
                Activity::new(ActivityKind::Purchase, 50, day(2024, 1, 1)),
                Activity::new(ActivityKind::Review, 30, day(2024, 1, 15)),
                Activity::new(ActivityKind::Referral, 20, day(2024, 2, 1)),
            ],
        },
        User {
            id: 2,
            name: "Jane Smith".into(),
            email: "jane@example.com".into(),
            points: 150,
            activities: vec![
                Activity::new(ActivityKind::Purchase, 100, day(2024, 1, 10)),
                Activity::new(ActivityKind::Review, 50, day(2024, 1, 20)),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_find_demo_user() {
        let store = MemoryUserStore::with_demo_users();
        let user = store.find(1).await.unwrap().unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.name, "John Doe");
        assert_eq!(user.activities.len(), 3);
    }

    #[tokio::test]
    async fn test_find_missing_user() {
        let store = MemoryUserStore::with_demo_users();
        assert!(store.find(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_user() {
        let store = MemoryUserStore::with_demo_users();
        let user = store
            .create(NewUser::new("New User", "new@example.com"))
            .await
            .unwrap();

        assert_eq!(user.id, 3);
        assert_eq!(user.name, "New User");
        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.points, 0);
        assert!(user.activities.is_empty());
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let store = MemoryUserStore::new();
        let err = store.create(NewUser::new("", "x@example.com")).await.unwrap_err();
        assert!(err.is_validation_error());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_all_is_ordered_by_id() {
        let store = MemoryUserStore::with_demo_users();
        store.create(NewUser::new("Third", "third@example.com")).await.unwrap();
        let ids: Vec<u64> = store.all().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_add_activity() {
        let store = MemoryUserStore::with_demo_users();
        store
            .add_activity(2, Activity::new(ActivityKind::Referral, 10, Utc::now()))
            .unwrap();
        let jane = store.find(2).await.unwrap().unwrap();
        assert!(jane.has_activity(ActivityKind::Referral));

        let err = store
            .add_activity(42, Activity::new(ActivityKind::Review, 1, Utc::now()))
            .unwrap_err();
        assert_eq!(err, ScoreCacheError::UserNotFound(42));
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryUserStore::with_demo_users();
        store.clear();
        assert!(store.is_empty());
        let user = store.create(NewUser::new("Fresh", "fresh@example.com")).await.unwrap();
        assert_eq!(user.id, 1);
    }

    #[tokio::test]
    async fn test_concurrent_create_assigns_unique_ids() {
        use tokio::task::JoinSet;

        let store = Arc::new(MemoryUserStore::new());
        let mut tasks = JoinSet::new();

        for i in 0..50 {
            let store = store.clone();
            tasks.spawn(async move {
                store
                    .create(NewUser::new(format!("user{i}"), format!("user{i}@example.com")))
                    .await
                    .unwrap()
                    .id
            });
        }

        let mut ids = Vec::new();
        while let Some(result) = tasks.join_next().await {
            ids.push(result.unwrap());
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 50);
        assert_eq!(store.len(), 50);
    }

    #[tokio::test]
    async fn test_insert_max_id_exhausts_id_space() {
        let store = MemoryUserStore::new();
        store.insert(User {
            id: u64::MAX,
            name: "Last".into(),
            email: "last@example.com".into(),
            points: 0,
            activities: Vec::new(),
        });

        let err = store
            .create(NewUser::new("Next", "next@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScoreCacheError::InternalError(_)));
        assert_eq!(store.find(u64::MAX).await.unwrap().unwrap().name, "Last");
        assert_eq!(store.len(), 1);
    }
}
