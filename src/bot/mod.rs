//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Handles commands and free-text answers
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `callback_data`: Encodes and parses button tokens
//! - `ui_builder`: Creates keyboards and formats messages
//! - `dialogue_manager`: Loads and stores sessions and delivers flow results
//! - `availability`: Checks Telegram usernames for the generation loop

pub mod availability;
pub mod callback_data;
pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

use reqwest::Url;
use tracing::warn;

use crate::config::BotConfig;
use crate::state_machine::ConversationStateMachine;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

pub use availability::TelegramAvailability;
pub use callback_data::CallbackData;
pub use ui_builder::BotLinks;

/// Shared state injected into every handler
pub struct AppState {
    pub machine: ConversationStateMachine,
    pub links: BotLinks,
}

impl AppState {
    pub fn new(machine: ConversationStateMachine, links: BotLinks) -> Self {
        Self { machine, links }
    }
}

impl BotLinks {
    /// Links from the configuration; malformed URLs are dropped with a warning
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            workshop: parse_link("WORKSHOP_URL", config.workshop_url.as_deref()),
            feedback: parse_link("FEEDBACK_URL", config.feedback_url.as_deref()),
        }
    }
}

fn parse_link(name: &str, raw: Option<&str>) -> Option<Url> {
    let raw = raw?;
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(setting = name, error = %e, "Ignoring malformed link");
            None
        }
    }
}
