use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use super::{Form, Invocation, QuestionNode, Response, Storage, Submission};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const IN_MEMORY_PATH: &str = ":memory:";

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        if config.path.as_os_str() == IN_MEMORY_PATH {
            return Self::new_in_memory().await;
        }

        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Create an in-memory instance (single connection, so every query sees the same database)
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_form_if_absent(&self, form: &Form) -> StorageResult<bool> {
        let questions = encode_json(&form.questions)?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO forms
                (id, source_description, title, description, questions, is_active, version, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&form.id)
        .bind(&form.source_description)
        .bind(&form.title)
        .bind(&form.description)
        .bind(&questions)
        .bind(form.is_active)
        .bind(form.version)
        .bind(encode_time(&form.created_at))
        .bind(encode_time(&form.updated_at))
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() == 1;
        if !inserted {
            debug!(form_id = %form.id, "Form id already taken");
        }
        Ok(inserted)
    }

    async fn get_form(&self, id: &str) -> StorageResult<Option<Form>> {
        let row: Option<FormRow> = sqlx::query_as(
            r#"
            SELECT id, source_description, title, description, questions, is_active, version, created_at, updated_at
            FROM forms
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Form::try_from).transpose()
    }

    async fn list_forms(&self) -> StorageResult<Vec<Form>> {
        let rows: Vec<FormRow> = sqlx::query_as(
            r#"
            SELECT id, source_description, title, description, questions, is_active, version, created_at, updated_at
            FROM forms
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Form::try_from).collect()
    }

    async fn update_form(&self, form: &Form) -> StorageResult<bool> {
        let questions = encode_json(&form.questions)?;

        let result = sqlx::query(
            r#"
            UPDATE forms
            SET title = ?, description = ?, questions = ?, is_active = ?, updated_at = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(&form.title)
        .bind(&form.description)
        .bind(&questions)
        .bind(form.is_active)
        .bind(encode_time(&form.updated_at))
        .bind(&form.id)
        .bind(form.version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn create_submission(&self, submission: &Submission) -> StorageResult<()> {
        let responses = encode_json(&submission.responses)?;

        sqlx::query(
            r#"
            INSERT INTO submissions (id, form_id, responses, completed_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&submission.id)
        .bind(&submission.form_id)
        .bind(&responses)
        .bind(encode_time(&submission.completed_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_submission(&self, id: &str) -> StorageResult<Option<Submission>> {
        let row: Option<SubmissionRow> = sqlx::query_as(
            r#"
            SELECT id, form_id, responses, completed_at
            FROM submissions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Submission::try_from).transpose()
    }

    async fn get_form_submissions(&self, form_id: &str) -> StorageResult<Vec<Submission>> {
        let rows: Vec<SubmissionRow> = sqlx::query_as(
            r#"
            SELECT id, form_id, responses, completed_at
            FROM submissions
            WHERE form_id = ?
            ORDER BY completed_at DESC, rowid DESC
            "#,
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Submission::try_from).collect()
    }

    async fn log_invocation(&self, invocation: &Invocation) -> StorageResult<()> {
        let input = encode_json(&invocation.input)?;
        let output = invocation.output.as_ref().map(encode_json).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO generator_invocations (id, form_id, role, input, output, latency_ms, success, error, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invocation.id)
        .bind(&invocation.form_id)
        .bind(&invocation.role)
        .bind(&input)
        .bind(&output)
        .bind(invocation.latency_ms)
        .bind(invocation.success)
        .bind(&invocation.error)
        .bind(encode_time(&invocation.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_form_invocations(&self, form_id: &str) -> StorageResult<Vec<Invocation>> {
        let rows: Vec<InvocationRow> = sqlx::query_as(
            r#"
            SELECT id, form_id, role, input, output, latency_ms, success, error, created_at
            FROM generator_invocations
            WHERE form_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Invocation::try_from).collect()
    }
}

/// Fixed-width UTC timestamps so that lexical order equals time order.
fn encode_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization {
            message: format!("Invalid timestamp '{}': {}", value, e),
        })
}

fn encode_json<T: serde::Serialize>(value: &T) -> StorageResult<String> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization {
        message: e.to_string(),
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(value: &str) -> StorageResult<T> {
    serde_json::from_str(value).map_err(|e| StorageError::Serialization {
        message: e.to_string(),
    })
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct FormRow {
    id: String,
    source_description: String,
    title: String,
    description: String,
    questions: String,
    is_active: bool,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<FormRow> for Form {
    type Error = StorageError;

    fn try_from(row: FormRow) -> StorageResult<Self> {
        let questions: Vec<QuestionNode> = decode_json(&row.questions)?;

        Ok(Self {
            id: row.id,
            source_description: row.source_description,
            title: row.title,
            description: row.description,
            questions,
            is_active: row.is_active,
            version: row.version,
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: String,
    form_id: String,
    responses: String,
    completed_at: String,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = StorageError;

    fn try_from(row: SubmissionRow) -> StorageResult<Self> {
        let responses: Vec<Response> = decode_json(&row.responses)?;

        Ok(Self {
            id: row.id,
            form_id: row.form_id,
            responses,
            completed_at: decode_time(&row.completed_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InvocationRow {
    id: String,
    form_id: Option<String>,
    role: String,
    input: String,
    output: Option<String>,
    latency_ms: Option<i64>,
    success: bool,
    error: Option<String>,
    created_at: String,
}

impl TryFrom<InvocationRow> for Invocation {
    type Error = StorageError;

    fn try_from(row: InvocationRow) -> StorageResult<Self> {
        Ok(Self {
            id: row.id,
            form_id: row.form_id,
            role: row.role,
            input: decode_json(&row.input)?,
            output: row.output.as_deref().map(decode_json).transpose()?,
            latency_ms: row.latency_ms,
            success: row.success,
            error: row.error,
            created_at: decode_time(&row.created_at)?,
        })
    }
}
