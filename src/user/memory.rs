//! In-process user store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::user::{Lookup, StoreError, StoreResult, User, UserStore};

/// [`UserStore`] keeping users in memory.
///
/// Uniqueness checks and the write they guard run under the same write
/// lock, so two concurrent writers can never both claim a key.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    /// Create an empty [`MemoryUserStore`].
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Internal("user store lock poisoned".into())
}

/// First key of `user` already held by another active user.
fn conflict(users: &HashMap<Uuid, User>, user: &User) -> Option<&'static str> {
    let mut active = users
        .values()
        .filter(|other| !other.is_deleted() && other.id != user.id);

    active.find_map(|other| {
        if other.username.to_lowercase() == user.username.to_lowercase() {
            Some("username")
        } else if other.email == user.email {
            Some("email")
        } else {
            None
        }
    })
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().map_err(poisoned)?;

        if users.contains_key(&user.id) {
            return Err(StoreError::Conflict { field: "id" });
        }
        if let Some(field) = conflict(&users, user) {
            return Err(StoreError::Conflict { field });
        }

        users.insert(user.id, user.clone());
        tracing::info!(user_id = %user.id, "user created");
        Ok(())
    }

    async fn find(&self, lookup: &Lookup) -> StoreResult<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        let mut active = users.values().filter(|user| !user.is_deleted());

        let user = match lookup {
            Lookup::Id(id) => active.find(|user| user.id == *id),
            Lookup::Email(email) => active.find(|user| user.email == *email),
            Lookup::Username(username) => {
                let username = username.to_lowercase();
                active.find(|user| user.username.to_lowercase() == username)
            },
        };

        Ok(user.cloned())
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().map_err(poisoned)?;

        match users.get(&user.id) {
            Some(current) if !current.is_deleted() => (),
            _ => return Err(StoreError::NotFound),
        }
        if let Some(field) = conflict(&users, user) {
            return Err(StoreError::Conflict { field });
        }

        users.insert(user.id, user.clone());
        tracing::debug!(user_id = %user.id, "user updated");
        Ok(())
    }

    async fn soft_delete(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let mut users = self.users.write().map_err(poisoned)?;

        match users.get_mut(&id) {
            Some(user) if !user.is_deleted() => {
                user.deleted_at = Some(at);
                user.updated_at = at;
                tracing::info!(user_id = %id, "user deleted");
                Ok(Some(user.clone()))
            },
            _ => Ok(None),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        self.users.read().map_err(poisoned).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn user(username: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: email.into(),
            username: username.into(),
            full_name: username.into(),
            display_name: username.into(),
            email_hash: crate::crypto::email_hash(email),
            is_admin: false,
            is_suspended: false,
            send_notifications: false,
            send_engagements: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_conflicts() {
        let store = MemoryUserStore::new();
        store.insert(&user("abc1", "abc1@email.com")).await.unwrap();

        assert!(matches!(
            store.insert(&user("ABC1", "other@email.com")).await,
            Err(StoreError::Conflict { field: "username" })
        ));
        assert!(matches!(
            store.insert(&user("other", "abc1@email.com")).await,
            Err(StoreError::Conflict { field: "email" })
        ));
    }

    #[tokio::test]
    async fn test_find_by_every_key() {
        let store = MemoryUserStore::new();
        let created = user("abc1", "abc1@email.com");
        store.insert(&created).await.unwrap();

        for lookup in [
            Lookup::Id(created.id),
            Lookup::Email("abc1@email.com".into()),
            Lookup::Username("ABC1".into()),
        ] {
            assert_eq!(store.find(&lookup).await.unwrap(), Some(created.clone()));
        }
        assert!(store
            .find(&Lookup::Username("abc2".into()))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_conflicts_with_others_only() {
        let store = MemoryUserStore::new();
        let first = user("first", "first@email.com");
        let second = user("second", "second@email.com");
        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();

        // Keeping its own keys is not a conflict.
        let mut changed = first.clone();
        changed.full_name = "First".into();
        store.update(&changed).await.unwrap();

        changed.username = "SECOND".into();
        assert!(matches!(
            store.update(&changed).await,
            Err(StoreError::Conflict { field: "username" })
        ));

        let missing = user("ghost", "ghost@email.com");
        assert!(matches!(store.update(&missing).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_soft_delete() {
        let store = MemoryUserStore::new();
        let created = user("abc1", "abc1@email.com");
        store.insert(&created).await.unwrap();

        let at = Utc::now();
        let deleted = store.soft_delete(created.id, at).await.unwrap().unwrap();
        assert_eq!(deleted.deleted_at, Some(at));
        assert!(store.find(&Lookup::Id(created.id)).await.unwrap().is_none());
        assert!(store.soft_delete(created.id, at).await.unwrap().is_none());

        let mut revived = created.clone();
        revived.full_name = "revived".into();
        assert!(matches!(store.update(&revived).await, Err(StoreError::NotFound)));

        // Keys of a deleted user are free again.
        store.insert(&user("abc1", "abc1@email.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_inserts_admit_one() {
        let store = Arc::new(MemoryUserStore::new());
        let handles = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .insert(&user("race", &format!("race{i}@email.com")))
                        .await
                })
            })
            .collect::<Vec<_>>();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }
}
