//! Telegram update handlers.
//!
//! Text messages are handed to [`operations::handle_text`], which drops anything from
//! users outside `BOT_OWNER_IDS` and runs commands for everyone else.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use harvest_core::{domain::OperatorId, messaging::types::ChatId};

use crate::router::AppState;

pub mod operations;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user = msg.from().map(|u| OperatorId(u.id.0 as i64));

    operations::handle_text(state, user, ChatId(msg.chat.id.0), text).await;
    Ok(())
}
