use async_trait::async_trait;

use crate::{
    domain::{ChatId, UserId},
    Result,
};

/// A user's membership status in one chat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberStatus {
    Owner,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MemberStatus {
    pub fn is_admin(self) -> bool {
        matches!(self, MemberStatus::Owner | MemberStatus::Administrator)
    }
}

/// Resolved chat membership for one user.
#[derive(Clone, Debug)]
pub struct ChatMember {
    pub user_id: UserId,
    pub display_name: String,
    pub status: MemberStatus,
    /// Restricted users may still be members; the platform reports this
    /// separately from the status itself.
    pub is_member: bool,
}

impl ChatMember {
    /// Whether this member can be notified at all.
    pub fn is_reachable(&self) -> bool {
        !matches!(
            self.status,
            MemberStatus::Left | MemberStatus::Kicked | MemberStatus::Restricted
        ) || self.is_member
    }
}

/// Port to the chat platform. The core never talks to Telegram directly.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn member_status(&self, group_id: ChatId, user_id: UserId) -> Result<ChatMember>;

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<()>;
}
