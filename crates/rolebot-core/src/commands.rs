//! Handlers for the command catalogue.
//!
//! Replies use the chat the command came from. Handlers assume guards and
//! argument validation already ran; they only enforce data-model rules.

use std::collections::BTreeMap;

use crate::{
    app::{App, InboundMessage},
    domain::{RoleName, UserId, SENTINEL_USER},
    formatting::{escape_html, tree_lines},
    mention::resolve_reachable,
    store::RoleFilter,
    Result,
};

pub(crate) const BAD_REQUEST: &str = "Bad formatted request";
pub(crate) const ADMIN_ONLY: &str = "Only admins can use this command!";
pub(crate) const FAILURE: &str = "Something went wrong, please try again later.";

pub(crate) async fn start(app: &App, msg: &InboundMessage) -> Result<()> {
    if !msg.chat_kind.is_group_like() {
        return app.gateway.send_text(msg.chat_id, "Hi!").await;
    }

    let mut message = format!("Hi!\nThe id for this group is {}, ", msg.chat_id.0);
    if app.registry.contains(msg.chat_id) {
        message.push_str("and it is registered :)");
    } else {
        message.push_str("and it is not registered yet. So most features may not available :(");
    }
    app.gateway.send_text(msg.chat_id, &message).await
}

pub(crate) async fn help(app: &App, msg: &InboundMessage) -> Result<()> {
    let mut lines = vec!["These are my commands, and they work only in registered groups:".to_string()];
    for spec in app.catalogue.iter().filter(|spec| !spec.hidden) {
        let cmd = format!("{}{} {}", app.cfg.command_prefix, spec.name, spec.usage);
        lines.push(format!(
            "<code>{}</code>",
            escape_html(&format!("{cmd:<20}{}", spec.help))
        ));
    }
    app.gateway.send_html(msg.chat_id, &lines.join("\n")).await
}

pub(crate) async fn about(app: &App, msg: &InboundMessage) -> Result<()> {
    app.gateway
        .send_text(
            msg.chat_id,
            "This telegram bot adds a feature to groups and super-groups similar to mention a \
             role in Discord. Members can join some roles and get notified when the role \
             mentioned.",
        )
        .await
}

pub(crate) async fn add(app: &App, msg: &InboundMessage, role: &RoleName) -> Result<()> {
    // Serialize check-then-insert per group so the cap check cannot race.
    let _guard = app.locks.lock_group(msg.chat_id).await;

    if !app.store.exists(msg.chat_id, role.as_str()).await? {
        let reply = format!("Role @{role} hasn't been created");
        return app.gateway.send_text(msg.chat_id, &reply).await;
    }

    let held = app
        .store
        .select(&RoleFilter::membership(msg.chat_id, msg.user_id, role))
        .await?;
    if !held.is_empty() {
        let reply = format!("Role @{role} exists for you");
        return app.gateway.send_text(msg.chat_id, &reply).await;
    }

    let all_roles = app.store.select(&RoleFilter::user(msg.user_id)).await?;
    if all_roles.len() >= app.cfg.max_roles {
        return app
            .gateway
            .send_text(msg.chat_id, "You have reached the maximum number of roles :(")
            .await;
    }

    let inserted = app
        .store
        .insert(msg.user_id, msg.chat_id, role.as_str())
        .await?;
    let reply = if inserted == 0 {
        // Lost a race against an identical request; the unique index caught it.
        format!("Role @{role} exists for you")
    } else {
        format!("Role @{role} added to you")
    };
    app.gateway.send_text(msg.chat_id, &reply).await
}

pub(crate) async fn del(app: &App, msg: &InboundMessage, role: &RoleName) -> Result<()> {
    let deleted = app
        .store
        .delete(&RoleFilter::membership(msg.chat_id, msg.user_id, role))
        .await?;
    let reply = if deleted > 0 {
        format!("Role @{role} deleted from you")
    } else {
        format!("You didn't have @{role}.")
    };
    app.gateway.send_text(msg.chat_id, &reply).await
}

pub(crate) async fn get(app: &App, msg: &InboundMessage, role: &RoleName) -> Result<()> {
    let records = app
        .store
        .select(&RoleFilter::group_role(msg.chat_id, role))
        .await?;
    let users: Vec<UserId> = records.iter().map(|r| r.user_id).collect();
    let members = resolve_reachable(app.gateway.as_ref(), msg.chat_id, &users).await;

    if members.is_empty() {
        return app.gateway.send_text(msg.chat_id, "No user with this role").await;
    }

    let mut lines = vec![format!("({}) @{role}", members.len())];
    lines.extend(tree_lines(members.iter().map(|m| m.display_name.clone())));
    app.gateway.send_text(msg.chat_id, &lines.join("\n")).await
}

pub(crate) async fn me(app: &App, msg: &InboundMessage) -> Result<()> {
    let records = app
        .store
        .select(&RoleFilter::group_user(msg.chat_id, msg.user_id))
        .await?;
    let roles: Vec<String> = records.iter().map(|r| format!("@{}", r.role)).collect();
    let reply = format!("Your roles: \n{}", roles.join(" "));
    app.gateway.send_text(msg.chat_id, &reply).await
}

pub(crate) async fn all(app: &App, msg: &InboundMessage) -> Result<()> {
    let records = app.store.select(&RoleFilter::group(msg.chat_id)).await?;

    let mut by_role: BTreeMap<String, Vec<UserId>> = BTreeMap::new();
    for record in records {
        by_role.entry(record.role).or_default().push(record.user_id);
    }

    let mut resolved = Vec::with_capacity(by_role.len());
    for (role, users) in by_role {
        let members = resolve_reachable(app.gateway.as_ref(), msg.chat_id, &users).await;
        resolved.push((role, members));
    }
    // Most-held roles first, names as tie break (BTreeMap already sorted them).
    resolved.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));

    if resolved.is_empty() {
        return app
            .gateway
            .send_text(msg.chat_id, "No entry found for this group")
            .await;
    }

    let mut lines = Vec::new();
    for (role, members) in &resolved {
        lines.push(format!("({}) @{role}: ", members.len()));
        lines.extend(tree_lines(members.iter().map(|m| m.display_name.clone())));
    }
    app.gateway.send_text(msg.chat_id, &lines.join("\n")).await
}

pub(crate) async fn create(app: &App, msg: &InboundMessage, role: &RoleName) -> Result<()> {
    let _guard = app.locks.lock_group(msg.chat_id).await;

    if app.store.exists(msg.chat_id, role.as_str()).await? {
        let reply = format!("Role @{role} exists in group");
        return app.gateway.send_text(msg.chat_id, &reply).await;
    }

    let inserted = app
        .store
        .insert(SENTINEL_USER, msg.chat_id, role.as_str())
        .await?;
    let reply = if inserted == 0 {
        format!("Role @{role} exists in group")
    } else {
        format!(
            "Role @{role} created. Users can join via {}add command",
            app.cfg.command_prefix
        )
    };
    app.gateway.send_text(msg.chat_id, &reply).await
}

pub(crate) async fn purge(app: &App, msg: &InboundMessage, role: &RoleName) -> Result<()> {
    if !app.store.exists(msg.chat_id, role.as_str()).await? {
        let reply = format!("Role @{role} not found");
        return app.gateway.send_text(msg.chat_id, &reply).await;
    }

    // Cascades over the sentinel and every membership row.
    app.store
        .delete(&RoleFilter::group_role(msg.chat_id, role))
        .await?;
    let reply = format!("Role @{role} purged from group");
    app.gateway.send_text(msg.chat_id, &reply).await
}
