//! Telegram adapter (teloxide).
//!
//! Implements the `rolebot-core` ChatGateway port over the Telegram Bot API
//! and provides the long-polling dispatch loop.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{ChatMemberKind, ParseMode},
};
use tokio::time::sleep;

pub mod polling;

pub use polling::run_polling;

use rolebot_core::{
    domain::{ChatId, UserId},
    errors::Error,
    gateway::{ChatGateway, ChatMember, MemberStatus},
    Result,
};

#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Gateway(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

fn map_member_kind(kind: &ChatMemberKind) -> (MemberStatus, bool) {
    match kind {
        ChatMemberKind::Owner(_) => (MemberStatus::Owner, true),
        ChatMemberKind::Administrator(_) => (MemberStatus::Administrator, true),
        ChatMemberKind::Member => (MemberStatus::Member, true),
        ChatMemberKind::Restricted(r) => (MemberStatus::Restricted, r.is_member),
        ChatMemberKind::Left => (MemberStatus::Left, false),
        ChatMemberKind::Banned(_) => (MemberStatus::Kicked, false),
    }
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn member_status(&self, group_id: ChatId, user_id: UserId) -> Result<ChatMember> {
        let member = self
            .with_retry(|| {
                self.bot.get_chat_member(
                    Self::tg_chat(group_id),
                    teloxide::types::UserId(user_id.0 as u64),
                )
            })
            .await?;

        let (status, is_member) = map_member_kind(&member.kind);
        Ok(ChatMember {
            user_id,
            display_name: member.user.full_name(),
            status,
            is_member,
        })
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.with_retry(|| self.bot.send_message(Self::tg_chat(chat_id), text.to_string()))
            .await?;
        Ok(())
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat_id), html.to_string())
                .parse_mode(ParseMode::Html)
        })
        .await?;
        Ok(())
    }
}
