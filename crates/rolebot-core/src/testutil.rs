//! In-memory test doubles for the store and gateway ports.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, RoleRecord, UserId},
    gateway::{ChatGateway, ChatMember, MemberStatus},
    store::{RoleFilter, RoleStore},
    Error, Result,
};

/// `RoleStore` double backed by a `Vec`, honoring the uniqueness contract.
#[derive(Default)]
pub(crate) struct MemoryStore {
    rows: Mutex<(i64, Vec<RoleRecord>)>,
    fail: AtomicBool,
}

impl MemoryStore {
    /// Insert one membership row per user id.
    pub(crate) async fn seed(&self, group_id: ChatId, role: &str, user_ids: &[i64]) {
        for &id in user_ids {
            self.insert(UserId(id), group_id, role)
                .await
                .expect("seed insert");
        }
    }

    /// Make every subsequent store call fail.
    pub(crate) fn fail_storage(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub(crate) fn row_count(&self) -> usize {
        self.rows.lock().unwrap().1.len()
    }

    fn check_fail(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Storage("store offline".to_string()));
        }
        Ok(())
    }
}

fn matches(record: &RoleRecord, filter: &RoleFilter) -> bool {
    filter.group_id.map_or(true, |g| record.group_id == g)
        && filter.user_id.map_or(true, |u| record.user_id == u)
        && filter.role.as_deref().map_or(true, |r| record.role == r)
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn exists(&self, group_id: ChatId, role: &str) -> Result<bool> {
        self.check_fail()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .1
            .iter()
            .any(|r| r.group_id == group_id && r.role == role))
    }

    async fn select(&self, filter: &RoleFilter) -> Result<Vec<RoleRecord>> {
        self.check_fail()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows.1.iter().filter(|r| matches(r, filter)).cloned().collect())
    }

    async fn insert(&self, user_id: UserId, group_id: ChatId, role: &str) -> Result<u64> {
        self.check_fail()?;
        let mut rows = self.rows.lock().unwrap();
        let duplicate = rows
            .1
            .iter()
            .any(|r| r.group_id == group_id && r.user_id == user_id && r.role == role);
        if duplicate {
            return Ok(0);
        }
        rows.0 += 1;
        let id = rows.0;
        rows.1.push(RoleRecord {
            id,
            user_id,
            group_id,
            role: role.to_string(),
        });
        Ok(1)
    }

    async fn delete(&self, filter: &RoleFilter) -> Result<u64> {
        self.check_fail()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.1.len();
        rows.1.retain(|r| !matches(r, filter));
        Ok((before - rows.1.len()) as u64)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct SentMessage {
    pub chat_id: i64,
    pub body: String,
    pub html: bool,
}

/// `ChatGateway` double: a fixed member table plus a log of outbound sends.
/// Status lookups for unknown users fail, like the real platform.
#[derive(Default)]
pub(crate) struct MockGateway {
    members: Mutex<HashMap<(i64, i64), ChatMember>>,
    sent: Mutex<Vec<SentMessage>>,
    fail_sends: AtomicUsize,
}

impl MockGateway {
    fn put(&self, group_id: ChatId, user_id: i64, name: &str, status: MemberStatus, is_member: bool) {
        self.members.lock().unwrap().insert(
            (group_id.0, user_id),
            ChatMember {
                user_id: UserId(user_id),
                display_name: name.to_string(),
                status,
                is_member,
            },
        );
    }

    pub(crate) fn add_member(&self, group_id: ChatId, user_id: i64, name: &str) {
        self.put(group_id, user_id, name, MemberStatus::Member, true);
    }

    pub(crate) fn add_admin(&self, group_id: ChatId, user_id: i64, name: &str) {
        self.put(group_id, user_id, name, MemberStatus::Administrator, true);
    }

    pub(crate) fn add_owner(&self, group_id: ChatId, user_id: i64, name: &str) {
        self.put(group_id, user_id, name, MemberStatus::Owner, true);
    }

    pub(crate) fn add_left(&self, group_id: ChatId, user_id: i64, name: &str) {
        self.put(group_id, user_id, name, MemberStatus::Left, false);
    }

    pub(crate) fn add_kicked(&self, group_id: ChatId, user_id: i64, name: &str) {
        self.put(group_id, user_id, name, MemberStatus::Kicked, false);
    }

    pub(crate) fn add_restricted(&self, group_id: ChatId, user_id: i64, name: &str, is_member: bool) {
        self.put(group_id, user_id, name, MemberStatus::Restricted, is_member);
    }

    /// Fail the next `n` sends (text or HTML).
    pub(crate) fn fail_next_sends(&self, n: usize) {
        self.fail_sends.store(n, Ordering::SeqCst);
    }

    pub(crate) fn sent_html(&self, chat_id: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id.0 && m.html)
            .map(|m| m.body.clone())
            .collect()
    }

    pub(crate) fn sent_text(&self, chat_id: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id.0 && !m.html)
            .map(|m| m.body.clone())
            .collect()
    }

    fn record(&self, chat_id: ChatId, body: &str, html: bool) -> Result<()> {
        let remaining = self.fail_sends.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_sends.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Gateway("send failed".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage {
            chat_id: chat_id.0,
            body: body.to_string(),
            html,
        });
        Ok(())
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn member_status(&self, group_id: ChatId, user_id: UserId) -> Result<ChatMember> {
        self.members
            .lock()
            .unwrap()
            .get(&(group_id.0, user_id.0))
            .cloned()
            .ok_or_else(|| Error::Gateway(format!("no member {} in {}", user_id.0, group_id.0)))
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.record(chat_id, text, false)
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<()> {
        self.record(chat_id, html, true)
    }
}
