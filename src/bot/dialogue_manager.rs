//! Dialogue Manager module: session loading, persistence of the session after
//! each flow operation, and delivery of the outcome to the chat

use anyhow::Result;
use std::future::Future;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ParseMode};
use tracing::{debug, info, warn};

use crate::dialogue::{BrandDialogue, ConversationSession, Stage};
use crate::errors::FlowError;
use crate::progress::{run_with_progress, DEFAULT_TICK_INTERVAL};
use crate::state_machine::Presentation;

use super::ui_builder::{render, render_error, Rendered};
use super::AppState;

/// Current session of the chat, or a fresh one in the user's language
pub async fn load_session(
    dialogue: &BrandDialogue,
    language_code: Option<&str>,
) -> Result<ConversationSession> {
    let mut session = dialogue.get().await?.unwrap_or_default();
    if session.language_code.is_none() {
        session.language_code = language_code.map(str::to_string);
    }
    Ok(session)
}

/// Store the session; a finished project leaves the dialogue
pub async fn store_session(dialogue: &BrandDialogue, session: ConversationSession) -> Result<()> {
    if session.stage == Stage::ProjectReady {
        debug!(chat_id = %dialogue.chat_id(), "Project finished, leaving dialogue");
        dialogue.exit().await?;
    } else {
        dialogue.update(session).await?;
    }
    Ok(())
}

/// Send a rendered message as HTML
pub async fn send_rendered(bot: &Bot, chat_id: ChatId, rendered: Rendered) -> Result<()> {
    let request = bot
        .send_message(chat_id, rendered.text)
        .parse_mode(ParseMode::Html);

    match rendered.keyboard {
        Some(keyboard) => request.reply_markup(keyboard).await?,
        None => request.await?,
    };
    Ok(())
}

/// Await a generation while Telegram shows the "typing" indicator
pub async fn with_typing<F: Future>(bot: &Bot, chat_id: ChatId, work: F) -> F::Output {
    let bot = bot.clone();
    run_with_progress(
        move || {
            let bot = bot.clone();
            async move {
                if let Err(e) = bot.send_chat_action(chat_id, ChatAction::Typing).await {
                    debug!(user_id = %chat_id, error = %e, "Failed to send typing indicator");
                }
            }
        },
        DEFAULT_TICK_INTERVAL,
        work,
    )
    .await
}

/// Persist the session and show the result of a flow operation
pub async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BrandDialogue,
    app: &AppState,
    session: ConversationSession,
    outcome: Result<Presentation, FlowError>,
) -> Result<()> {
    let language_code = session.language_code.clone();
    let language_code = language_code.as_deref();

    store_session(dialogue, session).await?;

    let rendered = match &outcome {
        Ok(presentation) => {
            info!(user_id = %chat_id, "Flow step completed");
            render(presentation, &app.links, language_code)
        }
        Err(error) => {
            warn!(user_id = %chat_id, error = %error, "Flow step failed");
            render_error(
                error,
                &app.links,
                app.machine.settings().max_context_length,
                language_code,
            )
        }
    };

    send_rendered(bot, chat_id, rendered).await
}
