//! Append-only persistence of generated usernames and project choices.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, error, info};

const CREATE_TABLE_SQL: &str = include_str!("sql/create_table.sql");
const INSERT_CHOICE_SQL: &str = include_str!("sql/insert_choice.sql");

const SELECT_COLUMNS: &str = "id, username, status, category, context, style, llm, created_at";

/// Status of a candidate that passed the availability check
pub const STATUS_AVAILABLE: &str = "available";
/// Status of a candidate already in use
pub const STATUS_TAKEN: &str = "taken";
/// Status of a candidate whose availability could not be determined
pub const STATUS_UNKNOWN: &str = "unknown";
/// Status of the username picked by the user
pub const STATUS_SELECTED: &str = "selected";
/// Status of a username whose project profile was completed
pub const STATUS_COMPLETED: &str = "completed";

/// Stored in `style`/`llm` when no value applies
pub const NONE_MARKER: &str = "None";

/// One persisted record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedChoice {
    pub value: String,
    pub status: String,
    pub context: String,
    pub category: String,
    pub style: String,
    pub source_model: String,
}

/// A record read back with its storage metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChoice {
    pub id: i64,
    pub choice: PersistedChoice,
    pub created_at: DateTime<Utc>,
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema");

    sqlx::raw_sql(CREATE_TABLE_SQL)
        .execute(pool)
        .await
        .context("Failed to create generated_usernames table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Insert a record and return its id
pub async fn insert_choice(pool: &PgPool, choice: &PersistedChoice) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(INSERT_CHOICE_SQL)
        .bind(&choice.value)
        .bind(&choice.status)
        .bind(&choice.category)
        .bind(&choice.context)
        .bind(&choice.style)
        .bind(&choice.source_model)
        .fetch_one(pool)
        .await
        .context("Failed to insert choice")?;

    debug!(id, value = %choice.value, status = %choice.status, "Choice stored");
    Ok(id)
}

/// Read a record by id
pub async fn read_choice(pool: &PgPool, id: i64) -> Result<Option<StoredChoice>> {
    let row = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM generated_usernames WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to read choice")?;

    row.as_ref().map(stored_choice_from_row).transpose()
}

/// All records stored for a value, oldest first
pub async fn list_choices_for_value(pool: &PgPool, value: &str) -> Result<Vec<StoredChoice>> {
    let rows = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM generated_usernames WHERE username = $1 ORDER BY id"
    ))
    .bind(value)
    .fetch_all(pool)
    .await
    .context("Failed to list choices")?;

    rows.iter().map(stored_choice_from_row).collect()
}

fn stored_choice_from_row(row: &PgRow) -> Result<StoredChoice> {
    Ok(StoredChoice {
        id: row.try_get("id")?,
        choice: PersistedChoice {
            value: row.try_get("username")?,
            status: row.try_get("status")?,
            context: row.try_get("context")?,
            category: row.try_get("category")?,
            style: row.try_get("style")?,
            source_model: row.try_get("llm")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

/// Best-effort destination of persisted records
#[async_trait]
pub trait ChoiceSink: Send + Sync {
    /// Store a record; failures are logged and never reported back
    async fn record(&self, choice: PersistedChoice);
}

/// Postgres-backed sink
pub struct PgChoiceStore {
    pool: PgPool,
}

impl PgChoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChoiceSink for PgChoiceStore {
    async fn record(&self, choice: PersistedChoice) {
        if let Err(e) = insert_choice(&self.pool, &choice).await {
            error!(
                value = %choice.value,
                status = %choice.status,
                error = %e,
                "Failed to persist choice, dropping record"
            );
        }
    }
}

/// In-memory sink keeping the most recent records
pub struct MemoryChoiceSink {
    records: Mutex<VecDeque<PersistedChoice>>,
    capacity: usize,
}

impl MemoryChoiceSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Copy of the kept records, oldest first
    pub fn records(&self) -> Vec<PersistedChoice> {
        match self.records.lock() {
            Ok(records) => records.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }
}

impl Default for MemoryChoiceSink {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl ChoiceSink for MemoryChoiceSink {
    async fn record(&self, choice: PersistedChoice) {
        let mut records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        if self.capacity == 0 {
            return;
        }
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(choice);
    }
}
