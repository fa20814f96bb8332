//! The application core: one entry point per inbound event, immutable
//! routing state constructed once at startup.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};

use crate::{
    commands,
    config::Config,
    domain::{ChatId, ChatKind, GroupRegistry, RoleName, UserId},
    gateway::ChatGateway,
    mention,
    router::{self, CommandKind, CommandSpec, Guard, GuardVerdict, Invocation},
    store::RoleStore,
    Result,
};

/// One inbound chat event, as delivered by the transport adapter.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub user_id: UserId,
    /// Message text, or the caption for media messages.
    pub text: Option<String>,
    pub is_edited: bool,
}

/// Per-group mutation locks: check-then-insert sequences for one group run
/// one at a time. Never held across gateway calls.
#[derive(Default)]
pub struct GroupLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl GroupLocks {
    pub async fn lock_group(&self, chat_id: ChatId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id.0)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Immutable-after-init bundle of config, catalogue, and ports.
pub struct App {
    pub(crate) cfg: Config,
    pub(crate) registry: GroupRegistry,
    pub(crate) catalogue: Vec<CommandSpec>,
    pub(crate) store: Arc<dyn RoleStore>,
    pub(crate) gateway: Arc<dyn ChatGateway>,
    pub(crate) locks: GroupLocks,
}

impl App {
    pub fn new(cfg: Config, store: Arc<dyn RoleStore>, gateway: Arc<dyn ChatGateway>) -> Self {
        let registry = GroupRegistry::from_ids(cfg.registered_groups.iter().copied());
        let catalogue = router::catalogue();
        info!(
            "{} commands registered, {} groups active",
            catalogue.len(),
            registry.len()
        );

        Self {
            cfg,
            registry,
            catalogue,
            store,
            gateway,
            locks: GroupLocks::default(),
        }
    }

    /// Entry point for every inbound message or caption-bearing media event.
    pub async fn handle_message(&self, msg: InboundMessage) -> Result<()> {
        // Policy: edits never (re-)trigger commands or notifications.
        if msg.is_edited {
            return Ok(());
        }
        let Some(text) = msg.text.clone() else {
            return Ok(());
        };

        if let Some(inv) = router::parse(&text, &self.cfg.command_prefix, &self.catalogue) {
            return self.dispatch(&inv, &msg).await;
        }

        // Everything else goes through mention resolution, registered groups only.
        if !msg.chat_kind.is_group_like() || !self.registry.contains(msg.chat_id) {
            return Ok(());
        }
        if let Err(e) = mention::notify_mentions(
            self.store.as_ref(),
            self.gateway.as_ref(),
            msg.chat_id,
            &text,
            self.cfg.mention_batch,
        )
        .await
        {
            error!("mention resolution failed in {}: {e}", msg.chat_id.0);
        }
        Ok(())
    }

    async fn dispatch(&self, inv: &Invocation<'_>, msg: &InboundMessage) -> Result<()> {
        for guard in inv.spec.guards {
            match self.check_guard(*guard, msg).await {
                GuardVerdict::Pass => {}
                GuardVerdict::Drop => return Ok(()),
                GuardVerdict::Reject(reply) => {
                    let _ = self.gateway.send_text(msg.chat_id, &reply).await;
                    return Ok(());
                }
            }
        }

        let role = if inv.spec.kind.takes_role_arg() {
            let parsed = match inv.args.as_slice() {
                [arg] => RoleName::parse_mention(arg),
                _ => None,
            };
            match parsed {
                Some(role) => Some(role),
                None => {
                    let _ = self
                        .gateway
                        .send_text(msg.chat_id, commands::BAD_REQUEST)
                        .await;
                    return Ok(());
                }
            }
        } else {
            None
        };

        let result = match inv.spec.kind {
            CommandKind::Start => commands::start(self, msg).await,
            CommandKind::Help => commands::help(self, msg).await,
            CommandKind::About => commands::about(self, msg).await,
            CommandKind::Me => commands::me(self, msg).await,
            CommandKind::All => commands::all(self, msg).await,
            kind => {
                let Some(role) = role else {
                    return Ok(());
                };
                match kind {
                    CommandKind::Add => commands::add(self, msg, &role).await,
                    CommandKind::Del => commands::del(self, msg, &role).await,
                    CommandKind::Get => commands::get(self, msg, &role).await,
                    CommandKind::Create => commands::create(self, msg, &role).await,
                    CommandKind::Purge => commands::purge(self, msg, &role).await,
                    _ => Ok(()),
                }
            }
        };

        if let Err(e) = result {
            error!("command {} failed in {}: {e}", inv.spec.name, msg.chat_id.0);
            let _ = self.gateway.send_text(msg.chat_id, commands::FAILURE).await;
        }
        Ok(())
    }

    async fn check_guard(&self, guard: Guard, msg: &InboundMessage) -> GuardVerdict {
        match guard {
            Guard::RegisteredGroup => {
                if msg.chat_kind.is_group_like() && self.registry.contains(msg.chat_id) {
                    GuardVerdict::Pass
                } else {
                    GuardVerdict::Drop
                }
            }
            Guard::GroupAdmin => {
                match self.gateway.member_status(msg.chat_id, msg.user_id).await {
                    Ok(member) if member.status.is_admin() => GuardVerdict::Pass,
                    Ok(_) => GuardVerdict::Reject(commands::ADMIN_ONLY.to_string()),
                    Err(e) => {
                        // Can't verify: fail closed.
                        warn!("admin check failed in {}: {e}", msg.chat_id.0);
                        GuardVerdict::Reject(commands::ADMIN_ONLY.to_string())
                    }
                }
            }
        }
    }
}
