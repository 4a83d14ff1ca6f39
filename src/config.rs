//! # Configuration Module
//!
//! Environment-driven settings for the bot: Telegram and LLM credentials,
//! model parameters, username generation ceilings and database location.

use anyhow::{anyhow, Context, Result};
use sqlx::postgres::PgConnectOptions;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::llm::CompletionRequest;

// Constants for flow configuration
pub const DEFAULT_MAX_CONTEXT_LENGTH: usize = 200;
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Topics offered by the "suggest an idea" button
pub const DEFAULT_IDEAS: [&str; 8] = [
    "Кофейня с книгами и настольными играми",
    "Подкаст о привычках продуктивных людей",
    "Сервис аренды туристического снаряжения",
    "Канал с рецептами из пяти ингредиентов",
    "Онлайн-школа рисования для взрослых",
    "Бот-напоминалка о поливе комнатных растений",
    "Клуб любителей утренних пробежек",
    "Маркетплейс авторской керамики",
];

/// Model parameters for one kind of generation
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ModelSettings {
    /// Build a completion request for this model
    pub fn request(&self, prompt: impl Into<String>) -> CompletionRequest {
        CompletionRequest {
            prompt: prompt.into(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Short answers: a category line and a list of usernames
    pub fn username_default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 40,
            temperature: 0.7,
        }
    }

    /// Longer answers: a comment and three options
    pub fn brand_default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 400,
            temperature: 0.7,
        }
    }
}

/// Ceilings and pacing of the username generation loop
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationLimits {
    /// Usernames requested from the LLM per attempt
    pub generated_count: usize,
    /// Available usernames to collect before stopping
    pub available_count: usize,
    /// Maximum LLM calls per generation
    pub attempts: u32,
    /// Wall-clock budget of a whole generation
    pub timeout: Duration,
    /// Empty answers tolerated before giving up
    pub max_empty_responses: u32,
    /// Pause between availability checks
    pub request_interval: Duration,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            generated_count: 10,
            available_count: 3,
            attempts: 5,
            timeout: Duration::from_secs(30),
            max_empty_responses: 3,
            request_interval: Duration::from_millis(300),
        }
    }
}

/// Settings consumed by the conversation state machine
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSettings {
    pub max_context_length: usize,
    pub username_model: ModelSettings,
    pub brand_model: ModelSettings,
    pub limits: GenerationLimits,
    pub ideas: Vec<String>,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            max_context_length: DEFAULT_MAX_CONTEXT_LENGTH,
            username_model: ModelSettings::username_default(),
            brand_model: ModelSettings::brand_default(),
            limits: GenerationLimits::default(),
            ideas: DEFAULT_IDEAS.iter().map(|idea| idea.to_string()).collect(),
        }
    }
}

/// Connection settings of the OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

/// Where the Postgres database lives
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseConfig {
    Url(String),
    Parts {
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    },
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match self {
            DatabaseConfig::Url(url) => url
                .parse::<PgConnectOptions>()
                .context("Failed to parse DATABASE_URL"),
            DatabaseConfig::Parts {
                host,
                port,
                user,
                password,
                database,
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .password(password)
                .database(database)),
        }
    }
}

/// Complete bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub llm: LlmConfig,
    pub database: Option<DatabaseConfig>,
    pub flow: FlowSettings,
    pub workshop_url: Option<String>,
    pub feedback_url: Option<String>,
}

impl BotConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup: &lookup };

        let telegram_token = env.required("BOT_TOKEN")?;
        let llm = LlmConfig {
            api_key: env.required("API_KEY")?,
            base_url: env
                .string("BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            request_timeout: Duration::from_secs(
                env.parse("LLM_TIMEOUT", DEFAULT_LLM_TIMEOUT_SECS)?,
            ),
        };

        let defaults = FlowSettings::default();
        let username_model = ModelSettings {
            model: env
                .string("MODEL_NAME")
                .unwrap_or(defaults.username_model.model),
            max_tokens: env.parse("MAX_TOKENS", defaults.username_model.max_tokens)?,
            temperature: env.parse("TEMPERATURE_NAME", defaults.username_model.temperature)?,
        };
        let brand_model = ModelSettings {
            model: env
                .string("MODEL_BRAND")
                .unwrap_or_else(|| username_model.model.clone()),
            max_tokens: env.parse("MAX_TOKENS_BRAND", defaults.brand_model.max_tokens)?,
            temperature: env.parse("TEMPERATURE_BRAND", defaults.brand_model.temperature)?,
        };
        let limits = GenerationLimits {
            generated_count: env.parse("GENERATED_USERNAME_COUNT", defaults.limits.generated_count)?,
            available_count: env.parse("AVAILABLE_USERNAME_COUNT", defaults.limits.available_count)?,
            attempts: env.parse("GEN_ATTEMPTS", defaults.limits.attempts)?,
            timeout: Duration::from_secs(env.parse("GEN_TIMEOUT", defaults.limits.timeout.as_secs())?),
            max_empty_responses: env.parse("MAX_EMPTY_RESPONSES", defaults.limits.max_empty_responses)?,
            request_interval: Duration::from_millis(env.parse(
                "REQUEST_INTERVAL_MS",
                defaults.limits.request_interval.as_millis() as u64,
            )?),
        };
        if limits.available_count == 0 || limits.attempts == 0 {
            return Err(anyhow!(
                "AVAILABLE_USERNAME_COUNT and GEN_ATTEMPTS must be greater than zero"
            ));
        }

        let flow = FlowSettings {
            max_context_length: env.parse("MAX_CONTEXT_LENGTH", defaults.max_context_length)?,
            username_model,
            brand_model,
            limits,
            ideas: defaults.ideas,
        };

        Ok(Self {
            telegram_token,
            llm,
            database: env.database()?,
            flow,
            workshop_url: env.string("WORKSHOP_URL"),
            feedback_url: env.string("FEEDBACK_URL"),
        })
    }
}

struct EnvReader<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<'_, F> {
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.string(key)
            .ok_or_else(|| anyhow!("{key} environment variable is required"))
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.string(key) {
            Some(raw) => raw
                .parse::<T>()
                .map_err(|e| anyhow!("Invalid value '{raw}' for {key}: {e}")),
            None => Ok(default),
        }
    }

    /// `DATABASE_URL` wins; otherwise `LOCAL_RUN` picks the `LOCAL_DB_*` or
    /// `CLOUD_DB_*` family. No host at all means no database.
    fn database(&self) -> Result<Option<DatabaseConfig>> {
        if let Some(url) = self.string("DATABASE_URL") {
            return Ok(Some(DatabaseConfig::Url(url)));
        }

        let local = self
            .string("LOCAL_RUN")
            .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let prefix = if local { "LOCAL_DB" } else { "CLOUD_DB" };

        let Some(host) = self.string(&format!("{prefix}_HOST")) else {
            return Ok(None);
        };

        Ok(Some(DatabaseConfig::Parts {
            host,
            port: self.parse(&format!("{prefix}_PORT"), 5432)?,
            user: self.string(&format!("{prefix}_USER")).unwrap_or_default(),
            password: self.string(&format!("{prefix}_PASSWORD")).unwrap_or_default(),
            database: self
                .string(&format!("{prefix}_NAME"))
                .unwrap_or_else(|| "postgres".to_string()),
        }))
    }
}
