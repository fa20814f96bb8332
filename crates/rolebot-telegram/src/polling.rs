//! Long-polling dispatch loop: teloxide updates in, core events out.

use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::{error, info};

use rolebot_core::{
    app::{App, InboundMessage},
    config::Config,
    domain::{ChatId, ChatKind, UserId},
    gateway::ChatGateway,
    store::RoleStore,
};

use crate::TelegramGateway;

pub async fn run_polling(cfg: Config, store: Arc<dyn RoleStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!("rolebot started: @{}", me.username());
    }
    info!("registered groups: {}", cfg.registered_groups.len());

    let gateway: Arc<dyn ChatGateway> = Arc::new(TelegramGateway::new(bot.clone()));
    let app = Arc::new(App::new(cfg, store, gateway));

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_edited_message().endpoint(handle_edited_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(msg: Message, app: Arc<App>) -> ResponseResult<()> {
    process(msg, app, false).await;
    Ok(())
}

async fn handle_edited_message(msg: Message, app: Arc<App>) -> ResponseResult<()> {
    process(msg, app, true).await;
    Ok(())
}

async fn process(msg: Message, app: Arc<App>, is_edited: bool) {
    let Some(inbound) = inbound_from(&msg, is_edited) else {
        return;
    };
    // A failing update must never take down the dispatch loop.
    if let Err(e) = app.handle_message(inbound).await {
        error!("update handling failed in {}: {e}", msg.chat.id.0);
    }
}

fn inbound_from(msg: &Message, is_edited: bool) -> Option<InboundMessage> {
    // Anonymous channel posts carry no sender; nothing to authorize against.
    let user = msg.from()?;

    let chat_kind = if msg.chat.is_group() {
        ChatKind::Group
    } else if msg.chat.is_supergroup() {
        ChatKind::Supergroup
    } else if msg.chat.is_channel() {
        ChatKind::Channel
    } else {
        ChatKind::Private
    };

    Some(InboundMessage {
        chat_id: ChatId(msg.chat.id.0),
        chat_kind,
        user_id: UserId(user.id.0 as i64),
        text: msg
            .text()
            .or_else(|| msg.caption())
            .map(str::to_string),
        is_edited,
    })
}
