mod lookup;
mod memory;
mod repository;
mod service;

pub use lookup::*;
pub use memory::*;
pub use repository::*;
pub use service::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// User as saved on the store and as returned to callers.
///
/// Every field is always serialized; only `deletedAt` may be `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub display_name: String,
    pub email_hash: String,
    pub is_admin: bool,
    pub is_suspended: bool,
    pub send_notifications: bool,
    pub send_engagements: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Whether the user was soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Caller-settable fields, used both on creation and on partial update.
///
/// `id`, `emailHash` and the timestamps are managed by the service and
/// silently ignored when sent.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserFields {
    pub username: Option<String>,
    pub email: Option<String>,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Full name must be 1 to 100 characters long."
    ))]
    pub full_name: Option<String>,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Display name must be 1 to 100 characters long."
    ))]
    pub display_name: Option<String>,
    pub is_admin: Option<bool>,
    pub is_suspended: Option<bool>,
    pub send_notifications: Option<bool>,
    pub send_engagements: Option<bool>,
}
