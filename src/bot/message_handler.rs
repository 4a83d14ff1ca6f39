//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::debug;

use crate::dialogue::{BrandDialogue, Stage};
use crate::errors::FlowError;
use crate::localization::t_lang;

use super::dialogue_manager::{deliver, load_session, send_rendered, store_session};
use super::ui_builder::{help, main_menu, main_menu_keyboard, render_error};
use super::AppState;

/// Slash commands understood by the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Reset,
}

impl Command {
    /// Parse `/start`, `/help`, `/reset`, with or without a `@botname` suffix
    pub fn parse(text: &str) -> Option<Command> {
        let first = text.split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);

        match name.to_lowercase().as_str() {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "reset" => Some(Command::Reset),
            _ => None,
        }
    }
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    dialogue: BrandDialogue,
    app: Arc<AppState>,
) -> Result<()> {
    let chat_id = msg.chat.id;
    let language_code = msg
        .from
        .as_ref()
        .and_then(|user| user.language_code.as_deref());

    let mut session = load_session(&dialogue, language_code).await?;
    let language_code = session.language_code.clone();
    let language_code = language_code.as_deref();

    let Some(text) = msg.text() else {
        debug!(user_id = %chat_id, "Ignoring non-text message");
        return send_rendered(&bot, chat_id, main_menu(&app.links, language_code)).await;
    };
    debug!(user_id = %chat_id, message_length = text.len(), "Received text message from user");

    match Command::parse(text) {
        Some(Command::Start) | Some(Command::Reset) => {
            app.machine.reset(&mut session);
            store_session(&dialogue, session).await?;
            return send_rendered(&bot, chat_id, main_menu(&app.links, language_code)).await;
        }
        Some(Command::Help) => {
            return send_rendered(&bot, chat_id, help(language_code)).await;
        }
        None => {}
    }

    match session.stage {
        Stage::AwaitingContext => {
            let outcome = app.machine.submit_context(&mut session, text);
            deliver(&bot, chat_id, &dialogue, &app, session, outcome).await
        }
        Stage::Idle => {
            bot.send_message(chat_id, t_lang("text-outside-flow", language_code))
                .reply_markup(main_menu_keyboard(&app.links, language_code))
                .await?;
            Ok(())
        }
        _ => {
            debug!(user_id = %chat_id, stage = ?session.stage, "Text received outside a text step");
            let rendered = render_error(
                &FlowError::UnexpectedState,
                &app.links,
                app.machine.settings().max_context_length,
                language_code,
            );
            send_rendered(&bot, chat_id, rendered).await
        }
    }
}
