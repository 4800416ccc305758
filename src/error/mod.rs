use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("{field} cannot be empty")]
    EmptyInput { field: String },

    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    #[error("Form generation failed: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Follow-up generation failed for {question_id}: {source}")]
    FollowUpGeneration {
        question_id: String,
        #[source]
        source: GeneratorError,
    },

    #[error("Failed to allocate a unique form id after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Build a validation error for a named input field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build a not-found error for a resource kind and id
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        AppError::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Concurrent modification of form {form_id}")]
    Conflict { form_id: String },

    #[error("Document encoding failed: {message}")]
    Serialization { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// External generator errors
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Generator returned empty output")]
    Empty,

    #[error("Generator output is not a JSON object: {message}")]
    InvalidOutput { message: String },

    #[error("Generator reported an error: {message}")]
    Reported { message: String },

    #[error("Generator output has the wrong shape: {message}")]
    Malformed { message: String },

    #[error("Generator process failed (exit code {code:?}): {message}")]
    Process { code: Option<i32>, message: String },

    #[error("Generator unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("Tool execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for generator calls
pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;
