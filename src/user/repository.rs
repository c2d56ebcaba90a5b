//! Handle database requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::user::{Lookup, User};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures of a [`UserStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{field} already belongs to another user")]
    Conflict { field: &'static str },
    #[error("no active user matches")]
    NotFound,
    #[error("store unreachable: {0}")]
    Unavailable(Box<dyn std::error::Error + Send + Sync>),
    #[error("store failure: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Backing store of [`User`] records.
///
/// Implementations guarantee that, among users without `deleted_at`, no
/// two share an email nor a (case-insensitive) username, and that the
/// guard and the write it protects are atomic.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user.
    async fn insert(&self, user: &User) -> StoreResult<()>;

    /// Find an active user with one interpretation of a token.
    async fn find(&self, lookup: &Lookup) -> StoreResult<Option<User>>;

    /// Replace every mutable field of an active user.
    async fn update(&self, user: &User) -> StoreResult<()>;

    /// Mark an active user as deleted, returning the deleted record.
    async fn soft_delete(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>>;

    /// Check the store answers.
    async fn ping(&self) -> StoreResult<()>;
}

const USERNAME_INDEX: &str = "users_username_key";
const EMAIL_INDEX: &str = "users_email_key";

const USER_COLUMNS: &str = r#"id, email, username, full_name, display_name,
    email_hash, is_admin, is_suspended, send_notifications, send_engagements,
    created_at, updated_at, deleted_at"#;

/// PostgreSQL [`UserStore`].
#[derive(Clone)]
pub struct PgUserStore {
    pool: Pool<Postgres>,
}

impl PgUserStore {
    /// Create a new [`PgUserStore`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            let field = match db.constraint() {
                Some(EMAIL_INDEX) => "email",
                Some(USERNAME_INDEX) => "username",
                _ => "user",
            };
            StoreError::Conflict { field }
        },
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(Box::new(err)),
        err => StoreError::Internal(Box::new(err)),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO users (
                id, email, username, full_name, display_name, email_hash,
                is_admin, is_suspended, send_notifications, send_engagements,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.display_name)
        .bind(&user.email_hash)
        .bind(user.is_admin)
        .bind(user.is_suspended)
        .bind(user.send_notifications)
        .bind(user.send_engagements)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        tracing::info!(user_id = %user.id, "user created");
        Ok(())
    }

    async fn find(&self, lookup: &Lookup) -> StoreResult<Option<User>> {
        let query = get_by_lookup_query(lookup);
        let query = sqlx::query_as::<_, User>(&query);
        let query = match lookup {
            Lookup::Id(id) => query.bind(*id),
            Lookup::Email(email) => query.bind(email.as_str()),
            Lookup::Username(username) => query.bind(username.as_str()),
        };

        query.fetch_optional(&self.pool).await.map_err(map_sqlx)
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"UPDATE users
                SET email = $2, username = $3, full_name = $4,
                    display_name = $5, email_hash = $6, is_admin = $7,
                    is_suspended = $8, send_notifications = $9,
                    send_engagements = $10, updated_at = $11
                WHERE id = $1 AND deleted_at IS NULL"#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.display_name)
        .bind(&user.email_hash)
        .bind(user.is_admin)
        .bind(user.is_suspended)
        .bind(user.send_notifications)
        .bind(user.send_engagements)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tracing::debug!(user_id = %user.id, "user updated");
        Ok(())
    }

    async fn soft_delete(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let query = format!(
            r#"UPDATE users SET deleted_at = $2, updated_at = $2
                WHERE id = $1 AND deleted_at IS NULL
                RETURNING {USER_COLUMNS}"#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if user.is_some() {
            tracing::info!(user_id = %id, "user deleted");
        }
        Ok(user)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}

fn get_by_lookup_query(lookup: &Lookup) -> String {
    let filter = match lookup {
        Lookup::Id(_) => "id = $1",
        Lookup::Email(_) => "email = $1",
        Lookup::Username(_) => "LOWER(username) = LOWER($1)",
    };

    format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {filter} AND deleted_at IS NULL"
    )
}

#[cfg(test)]
mod tests {
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

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL instance reachable through DATABASE_URL"]
    async fn test_pg_store_lifecycle(pool: Pool<Postgres>) {
        let store = PgUserStore::new(pool);
        store.ping().await.unwrap();

        let first = user("Abc1", "abc1@email.com");
        store.insert(&first).await.unwrap();

        let found = store
            .find(&Lookup::Username("abc1".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);

        let duplicate = user("ABC1", "other@email.com");
        assert!(matches!(
            store.insert(&duplicate).await,
            Err(StoreError::Conflict { field: "username" })
        ));
        let duplicate = user("other", "abc1@email.com");
        assert!(matches!(
            store.insert(&duplicate).await,
            Err(StoreError::Conflict { field: "email" })
        ));

        let deleted = store.soft_delete(first.id, Utc::now()).await.unwrap();
        assert!(deleted.unwrap().deleted_at.is_some());
        assert!(store.find(&Lookup::Id(first.id)).await.unwrap().is_none());
        assert!(store.soft_delete(first.id, Utc::now()).await.unwrap().is_none());

        // Deleted users free their username and email.
        store.insert(&user("abc1", "abc1@email.com")).await.unwrap();
    }
}
