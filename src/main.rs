use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use brand_bot::bot::{self, AppState, BotLinks, TelegramAvailability};
use brand_bot::config::{BotConfig, DatabaseConfig};
use brand_bot::db::{self, ChoiceSink, MemoryChoiceSink, PgChoiceStore};
use brand_bot::dialogue::ConversationSession;
use brand_bot::llm::OpenAiClient;
use brand_bot::localization;
use brand_bot::state_machine::ConversationStateMachine;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();
    info!("Starting Brand Telegram Bot");

    let config = BotConfig::from_env().context("Failed to load configuration")?;
    localization::init_localization().context("Failed to load locales")?;

    let bot = Bot::new(&config.telegram_token);

    let sink: Arc<dyn ChoiceSink> = match &config.database {
        Some(database) => match connect_database(database).await {
            Ok(pool) => Arc::new(PgChoiceStore::new(pool)),
            Err(e) => {
                error!(error = %e, "Database unavailable, choices are kept in memory only");
                Arc::new(MemoryChoiceSink::default())
            }
        },
        None => {
            warn!("No database configured, choices are kept in memory only");
            Arc::new(MemoryChoiceSink::default())
        }
    };

    let llm = Arc::new(OpenAiClient::new(&config.llm)?);
    let availability = Arc::new(TelegramAvailability::new(bot.clone()));
    let machine = ConversationStateMachine::new(llm, sink, availability, config.flow.clone());
    let app = Arc::new(AppState::new(machine, BotLinks::from_config(&config)));

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<ConversationSession>, ConversationSession>()
                .endpoint(bot::message_handler),
        )
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, InMemStorage<ConversationSession>, ConversationSession>()
                .endpoint(bot::callback_handler),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![
            InMemStorage::<ConversationSession>::new(),
            app
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// `RUST_LOG` wins over `LOG_LEVEL`; `LOG_FORMAT=json` switches to JSON lines
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        EnvFilter::try_new(level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn connect_database(database: &DatabaseConfig) -> Result<PgPool> {
    let options = database.connect_options()?;

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .context("Failed to connect to Postgres")?;

    db::init_database_schema(&pool).await?;
    info!("Database connection pool ready");
    Ok(pool)
}
