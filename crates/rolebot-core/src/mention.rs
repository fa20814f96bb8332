//! Mention resolution: role tokens in free text → reachable members →
//! bounded notification batches.

use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;
use tracing::warn;

use crate::{
    domain::{ChatId, UserId},
    formatting::mention_link,
    gateway::{ChatGateway, ChatMember},
    store::{RoleFilter, RoleStore},
    Result,
};

fn role_token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A token counts only at start-of-text or after whitespace, never inside
    // a longer word.
    RE.get_or_init(|| Regex::new(r"(?:^|\s)@([A-Za-z0-9_]{5,32})").expect("valid pattern"))
}

/// Distinct role tokens in `text`, in order of first appearance.
pub fn extract_role_tokens(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for caps in role_token_pattern().captures_iter(text) {
        let role = &caps[1];
        if seen.insert(role.to_string()) {
            out.push(role.to_string());
        }
    }
    out
}

/// Union the membership of `roles` into a deduplicated user list, preserving
/// the order of first appearance. The sentinel owner is not a target.
pub async fn collect_targets(
    store: &dyn RoleStore,
    group_id: ChatId,
    roles: &[String],
) -> Result<Vec<UserId>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for role in roles {
        let filter = RoleFilter {
            group_id: Some(group_id),
            role: Some(role.clone()),
            ..RoleFilter::default()
        };
        for record in store.select(&filter).await? {
            if record.user_id.is_sentinel() {
                continue;
            }
            if seen.insert(record.user_id) {
                out.push(record.user_id);
            }
        }
    }
    Ok(out)
}

/// Resolve users to live chat members, keeping only the reachable ones.
///
/// A failed status lookup degrades that one user to "unreachable" instead of
/// failing the whole resolution.
pub async fn resolve_reachable(
    gateway: &dyn ChatGateway,
    group_id: ChatId,
    users: &[UserId],
) -> Vec<ChatMember> {
    let mut out = Vec::new();
    for &user_id in users {
        if user_id.is_sentinel() {
            continue;
        }
        match gateway.member_status(group_id, user_id).await {
            Ok(member) if member.is_reachable() => out.push(member),
            Ok(_) => {}
            Err(e) => {
                warn!("member lookup failed for {} in {}: {e}", user_id.0, group_id.0);
            }
        }
    }
    out
}

/// Notify every current holder of the roles mentioned in `text`.
///
/// One HTML message per batch of `batch_size` members; a failed batch send is
/// logged and later batches are still attempted. Emits nothing when no role
/// resolves to a reachable member.
pub async fn notify_mentions(
    store: &dyn RoleStore,
    gateway: &dyn ChatGateway,
    group_id: ChatId,
    text: &str,
    batch_size: usize,
) -> Result<()> {
    let roles = extract_role_tokens(text);
    if roles.is_empty() {
        return Ok(());
    }

    let targets = collect_targets(store, group_id, &roles).await?;
    let members = resolve_reachable(gateway, group_id, &targets).await;
    if members.is_empty() {
        return Ok(());
    }

    for batch in members.chunks(batch_size.max(1)) {
        let message = batch.iter().map(mention_link).collect::<Vec<_>>().join(", ");
        if let Err(e) = gateway.send_html(group_id, &message).await {
            warn!("mention batch send failed in {}: {e}", group_id.0);
        }
    }

    Ok(())
}
