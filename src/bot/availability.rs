//! Username availability checks against the Telegram Bot API

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use teloxide::{ApiError, RequestError};
use tracing::debug;

use crate::username::{Availability, UsernameAvailability};

/// Resolves `@name` with `getChat`: a missing chat means the name is free
pub struct TelegramAvailability {
    bot: Bot,
}

impl TelegramAvailability {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl UsernameAvailability for TelegramAvailability {
    async fn check(&self, username: &str) -> Availability {
        let recipient = Recipient::ChannelUsername(format!("@{username}"));

        match self.bot.get_chat(recipient).await {
            Ok(_) => Availability::Taken,
            Err(error) => classify_error(username, &error),
        }
    }
}

fn classify_error(username: &str, error: &RequestError) -> Availability {
    match error {
        RequestError::Api(ApiError::ChatNotFound) => Availability::Available,
        RequestError::Api(ApiError::Unknown(message))
            if message.to_lowercase().contains("not found") =>
        {
            Availability::Available
        }
        other => {
            debug!(username, error = %other, "Availability check inconclusive");
            Availability::Unknown
        }
    }
}
