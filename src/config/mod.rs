use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub generator: GeneratorConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Which generator implementation backs the four generator roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorBackend {
    /// Child process per call, JSON on stdin, JSON on stdout
    Command,
    /// Langbase-compatible pipes over HTTP
    Pipe,
}

/// External generator configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub backend: GeneratorBackend,
    pub langbase: LangbaseConfig,
    pub pipes: PipeConfig,
    pub commands: CommandConfig,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Langbase pipe name per generator role
#[derive(Debug, Clone)]
pub struct PipeConfig {
    pub form: String,
    pub follow_up: String,
    pub report: String,
    pub strategy: String,
}

/// Command line per generator role, split on whitespace
#[derive(Debug, Clone)]
pub struct CommandConfig {
    pub form: String,
    pub follow_up: String,
    pub report: String,
    pub strategy: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let backend = match env::var("GENERATOR_BACKEND")
            .unwrap_or_else(|_| "command".to_string())
            .to_lowercase()
            .as_str()
        {
            "command" => GeneratorBackend::Command,
            "pipe" => GeneratorBackend::Pipe,
            other => {
                return Err(AppError::Config {
                    message: format!(
                        "GENERATOR_BACKEND must be 'command' or 'pipe', got '{}'",
                        other
                    ),
                })
            }
        };

        let api_key = env::var("LANGBASE_API_KEY").unwrap_or_default();
        if backend == GeneratorBackend::Pipe && api_key.trim().is_empty() {
            return Err(AppError::Config {
                message: "LANGBASE_API_KEY is required when GENERATOR_BACKEND=pipe".to_string(),
            });
        }

        let langbase = LangbaseConfig {
            api_key,
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let defaults = PipeConfig::default();
        let pipes = PipeConfig {
            form: env::var("PIPE_FORM").unwrap_or(defaults.form),
            follow_up: env::var("PIPE_FOLLOW_UP").unwrap_or(defaults.follow_up),
            report: env::var("PIPE_REPORT").unwrap_or(defaults.report),
            strategy: env::var("PIPE_STRATEGY").unwrap_or(defaults.strategy),
        };

        let defaults = CommandConfig::default();
        let commands = CommandConfig {
            form: env::var("GENERATOR_FORM_COMMAND").unwrap_or(defaults.form),
            follow_up: env::var("GENERATOR_FOLLOW_UP_COMMAND").unwrap_or(defaults.follow_up),
            report: env::var("GENERATOR_REPORT_COMMAND").unwrap_or(defaults.report),
            strategy: env::var("GENERATOR_STRATEGY_COMMAND").unwrap_or(defaults.strategy),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/feedback.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        };

        Ok(Config {
            generator: GeneratorConfig {
                backend,
                langbase,
                pipes,
                commands,
            },
            database,
            logging,
            request,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            form: "feedback-form-v1".to_string(),
            follow_up: "feedback-follow-up-v1".to_string(),
            report: "feedback-report-v1".to_string(),
            strategy: "feedback-strategy-v1".to_string(),
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            form: "python3 generate_form.py".to_string(),
            follow_up: "python3 generate_follow_up.py".to_string(),
            report: "python3 generate_report.py".to_string(),
            strategy: "python3 strategy.py".to_string(),
        }
    }
}
