use std::{collections::HashSet, fmt, sync::OnceLock};

use regex::Regex;

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric). Groups and supergroups are chats too.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Owner of a role-definition row that no real user holds.
///
/// Must never show up in member listings or notifications.
pub const SENTINEL_USER: UserId = UserId(-1);

impl UserId {
    pub fn is_sentinel(self) -> bool {
        self == SENTINEL_USER
    }
}

/// What kind of chat an update came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Roles only make sense in groups and supergroups.
    pub fn is_group_like(self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

/// A validated role name: 5-32 characters, alphanumeric or underscore,
/// case-sensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleName(String);

fn role_arg_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@([A-Za-z0-9_]{5,32})$").expect("valid pattern"))
}

impl RoleName {
    /// Parse a command argument of the form `@name`.
    pub fn parse_mention(arg: &str) -> Option<Self> {
        let caps = role_arg_pattern().captures(arg)?;
        Some(Self(caps[1].to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the role table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleRecord {
    pub id: i64,
    pub user_id: UserId,
    pub group_id: ChatId,
    pub role: String,
}

/// The set of group ids the bot is active in. Loaded once at startup and
/// immutable for the process lifetime.
#[derive(Clone, Debug, Default)]
pub struct GroupRegistry {
    groups: HashSet<ChatId>,
}

impl GroupRegistry {
    pub fn from_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            groups: ids.into_iter().map(ChatId).collect(),
        }
    }

    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.groups.contains(&chat_id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
