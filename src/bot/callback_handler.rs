//! Callback Handler module for processing inline keyboard callbacks

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, warn};

use crate::dialogue::{BrandDialogue, Field};
use crate::localization::t_lang;
use crate::state_machine::Presentation;

use super::callback_data::CallbackData;
use super::dialogue_manager::{deliver, load_session, send_rendered, store_session, with_typing};
use super::ui_builder::{help, main_menu, render, render_error, style_list};
use super::AppState;

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dialogue: BrandDialogue,
    app: Arc<AppState>,
) -> Result<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(message) = q.message.as_ref() else {
        debug!(user_id = %q.from.id, "Callback without an accessible message");
        return Ok(());
    };
    let chat_id = message.chat().id;

    let mut session = load_session(&dialogue, q.from.language_code.as_deref()).await?;
    let language_code = session.language_code.clone();
    let language_code = language_code.as_deref();

    let data = q.data.as_deref().unwrap_or_default();
    debug!(user_id = %chat_id, callback_data = %data, "Received callback query");

    let action = match CallbackData::parse(data) {
        Ok(action) => action,
        Err(error) => {
            warn!(user_id = %chat_id, callback_data = %data, error = %error, "Unrecognized callback data");
            let rendered = render_error(
                &error,
                &app.links,
                app.machine.settings().max_context_length,
                language_code,
            );
            return send_rendered(&bot, chat_id, rendered).await;
        }
    };

    match action {
        CallbackData::MainMenu => {
            app.machine.reset(&mut session);
            store_session(&dialogue, session).await?;
            send_rendered(&bot, chat_id, main_menu(&app.links, language_code)).await
        }
        CallbackData::Help => send_rendered(&bot, chat_id, help(language_code)).await,
        CallbackData::CreateProject => {
            let presentation = app.machine.begin(&mut session);
            deliver(&bot, chat_id, &dialogue, &app, session, Ok(presentation)).await
        }
        CallbackData::SuggestIdea => {
            let outcome = app.machine.suggest_context(&mut session, &mut rand::thread_rng());
            deliver(&bot, chat_id, &dialogue, &app, session, outcome).await
        }
        CallbackData::StyleMenu => send_rendered(&bot, chat_id, style_list(language_code)).await,
        CallbackData::StyleBack => {
            let context = session.fields.get(Field::Context).unwrap_or_default().to_string();
            let rendered = render(&Presentation::StyleMenu { context }, &app.links, language_code);
            send_rendered(&bot, chat_id, rendered).await
        }
        CallbackData::NoStyle | CallbackData::Style(_) => {
            let style = match action {
                CallbackData::Style(style) => Some(style),
                _ => None,
            };
            bot.send_message(chat_id, t_lang("generating-usernames", language_code))
                .await?;
            let outcome = with_typing(&bot, chat_id, app.machine.choose_style(&mut session, style)).await;
            deliver(&bot, chat_id, &dialogue, &app, session, outcome).await
        }
        CallbackData::Username(index) => {
            bot.send_message(chat_id, t_lang("generating-options", language_code))
                .await?;
            let outcome =
                with_typing(&bot, chat_id, app.machine.select_username(&mut session, index)).await;
            deliver(&bot, chat_id, &dialogue, &app, session, outcome).await
        }
        CallbackData::Option(index) => {
            let outcome =
                with_typing(&bot, chat_id, app.machine.select_option(&mut session, index)).await;
            deliver(&bot, chat_id, &dialogue, &app, session, outcome).await
        }
        CallbackData::Repeat => {
            let outcome = with_typing(&bot, chat_id, app.machine.repeat(&mut session)).await;
            deliver(&bot, chat_id, &dialogue, &app, session, outcome).await
        }
    }
}
