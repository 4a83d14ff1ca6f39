//! # Brand Telegram Bot
//!
//! A Telegram bot that turns a free-text idea into a project concept: it
//! finds a free username, then walks the user through three LLM-generated
//! choices (format, audience, core value) and closes with a project profile.

pub mod bot;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod errors;
pub mod llm;
pub mod localization;
pub mod progress;
pub mod prompt_builder;
pub mod response_parser;
pub mod state_machine;
pub mod username;
