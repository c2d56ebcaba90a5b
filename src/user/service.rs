use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::crypto::email_hash;
use crate::error::{Result, ServerError};
use crate::user::{Lookup, StoreResult, User, UserFields, UserStore};
use crate::validation::{Rejection, Validator};

/// User manager.
///
/// Validates caller input, resolves lookup tokens and drives the
/// [`UserStore`]. Every store call is bounded by `timeout`.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    validator: Arc<Validator>,
    timeout: Duration,
}

impl UserService {
    /// Create a new [`UserService`].
    pub fn new(
        store: Arc<dyn UserStore>,
        validator: Validator,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            validator: Arc::new(validator),
            timeout,
        }
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = StoreResult<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "store operation timed out");
                Err(ServerError::StoreUnavailable)
            },
        }
    }

    /// Check the store answers within the timeout.
    pub async fn health(&self) -> Result<()> {
        self.bounded(self.store.ping()).await
    }

    /// Find the active user a token denotes.
    ///
    /// Interpretations are tried as id, then email, then username; the
    /// first match wins.
    pub async fn resolve(&self, token: &str) -> Result<User> {
        let candidates = Lookup::candidates(token).map_err(|err| {
            tracing::debug!(error = %err, "token refused");
            ServerError::NotFound
        })?;

        for lookup in candidates {
            if let Some(user) = self.bounded(self.store.find(&lookup)).await? {
                tracing::trace!(%lookup, user_id = %user.id, "token resolved");
                return Ok(user);
            }
        }

        Err(ServerError::NotFound)
    }

    /// Create a user from caller fields.
    pub async fn create(&self, fields: UserFields) -> Result<User> {
        fields.validate()?;
        let username = fields.username.as_deref().ok_or_else(|| {
            ServerError::invalid("username", "username is required")
        })?;
        let username = self.validator.username(username)?;
        let email = fields
            .email
            .as_deref()
            .ok_or_else(|| ServerError::invalid("email", "email is required"))?;
        let email = self.validator.email(email)?;

        let full_name = fields.full_name.unwrap_or_else(|| username.clone());
        let display_name = fields.display_name.unwrap_or_else(|| full_name.clone());
        let now = Utc::now();

        let user = User {
            id: Uuid::new_v4(),
            email_hash: email_hash(&email),
            email,
            username,
            full_name,
            display_name,
            is_admin: fields.is_admin.unwrap_or_default(),
            is_suspended: fields.is_suspended.unwrap_or_default(),
            send_notifications: fields.send_notifications.unwrap_or_default(),
            send_engagements: fields.send_engagements.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.bounded(self.store.insert(&user)).await?;
        Ok(user)
    }

    /// Apply a partial update to the user `token` denotes.
    ///
    /// Nothing is written unless every supplied field is valid.
    pub async fn update(&self, token: &str, fields: UserFields) -> Result<User> {
        fields.validate()?;
        let mut user = self.resolve(token).await?;

        if let Some(username) = fields.username.as_deref() {
            user.username = self.validator.username(username)?;
        }
        if let Some(email) = fields.email.as_deref() {
            user.email = self.validator.email(email)?;
            user.email_hash = email_hash(&user.email);
        }
        if let Some(full_name) = fields.full_name {
            user.full_name = full_name;
        }
        if let Some(display_name) = fields.display_name {
            user.display_name = display_name;
        }
        if let Some(is_admin) = fields.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(is_suspended) = fields.is_suspended {
            user.is_suspended = is_suspended;
        }
        if let Some(send_notifications) = fields.send_notifications {
            user.send_notifications = send_notifications;
        }
        if let Some(send_engagements) = fields.send_engagements {
            user.send_engagements = send_engagements;
        }
        user.updated_at = Utc::now();

        self.bounded(self.store.update(&user)).await?;
        Ok(user)
    }

    /// Soft-delete the user `token` denotes.
    pub async fn delete(&self, token: &str) -> Result<User> {
        let user = self.resolve(token).await?;

        self.bounded(self.store.soft_delete(user.id, Utc::now()))
            .await?
            .ok_or(ServerError::NotFound)
    }

    /// Whether `name` is taken, for the availability endpoint.
    ///
    /// Empty names are a bad request and blocked words are forbidden.
    /// Names that could never be registered are reported as available.
    pub async fn username_in_use(&self, name: &str) -> Result<User> {
        if name.is_empty() {
            return Err(ServerError::BadRequest("username is empty".into()));
        }

        match self.validator.username(name) {
            Ok(_) => (),
            Err(Rejection::BlockedWord(word)) => {
                return Err(ServerError::Forbidden(word));
            },
            Err(Rejection::InvalidFormat { .. }) => {
                return Err(ServerError::NotFound);
            },
        }

        self.bounded(self.store.find(&Lookup::Username(name.to_owned())))
            .await?
            .ok_or(ServerError::NotFound)
    }
}
