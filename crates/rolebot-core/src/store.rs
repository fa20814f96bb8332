use async_trait::async_trait;

use crate::{
    domain::{ChatId, RoleName, RoleRecord, UserId},
    Result,
};

/// Partial filter over the role table. Empty fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleFilter {
    pub group_id: Option<ChatId>,
    pub user_id: Option<UserId>,
    pub role: Option<String>,
}

impl RoleFilter {
    pub fn group(group_id: ChatId) -> Self {
        Self {
            group_id: Some(group_id),
            ..Self::default()
        }
    }

    pub fn group_role(group_id: ChatId, role: &RoleName) -> Self {
        Self {
            group_id: Some(group_id),
            role: Some(role.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn group_user(group_id: ChatId, user_id: UserId) -> Self {
        Self {
            group_id: Some(group_id),
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// One user's membership in one role of one group.
    pub fn membership(group_id: ChatId, user_id: UserId, role: &RoleName) -> Self {
        Self {
            group_id: Some(group_id),
            user_id: Some(user_id),
            role: Some(role.as_str().to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.group_id.is_none() && self.user_id.is_none() && self.role.is_none()
    }
}

/// Port for the persistent role table.
///
/// The storage layer enforces uniqueness of `(group_id, user_id, role)`:
/// a racing duplicate `insert` comes back as 0 rows, never as corruption.
/// Everything else (sentinel filtering, the per-user cap) is the caller's
/// job.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// True if any record, sentinel or member, matches `(group_id, role)`.
    async fn exists(&self, group_id: ChatId, role: &str) -> Result<bool>;

    /// All matching records in insertion order.
    async fn select(&self, filter: &RoleFilter) -> Result<Vec<RoleRecord>>;

    /// Rows inserted: 1, or 0 when the membership already exists.
    async fn insert(&self, user_id: UserId, group_id: ChatId, role: &str) -> Result<u64>;

    /// Rows deleted. An empty filter wipes the table; command handlers must
    /// never build one.
    async fn delete(&self, filter: &RoleFilter) -> Result<u64>;
}
