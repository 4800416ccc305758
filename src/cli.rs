//! Command-line interface.
//!
//! With no subcommand the binary serves MCP over stdio. The other commands
//! read the same database and print pretty JSON to stdout.

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::server::AppState;

/// Adaptive feedback forms: generated questionnaires that grow follow-up
/// questions at answer time, with submission analytics.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run (default: serve)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Serve MCP over stdio
    Serve,

    /// List all forms, newest first
    List,

    /// Show one form with all its questions
    Show {
        /// Form identifier
        form_id: String,
    },

    /// Show answer distributions for a form
    Analytics {
        /// Form identifier
        form_id: String,

        /// Also generate a narrative report
        #[arg(long)]
        narrative: bool,
    },

    /// Generate a strategic analysis for a form
    Strategy {
        /// Form identifier
        form_id: String,
    },
}

impl Cli {
    /// The command to run, `serve` when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

/// Result of CLI command execution.
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }

    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self::success(text),
            Err(e) => Self::error(format!("Failed to render output: {}", e)),
        }
    }
}

/// Execute a read-only CLI command. `serve` is handled by the caller.
pub async fn execute_command(command: Commands, state: &AppState) -> CliResult {
    let result = match command {
        Commands::Serve => return CliResult::error("serve is not a one-shot command"),
        Commands::List => state.registry.list().await.map(|forms| CliResult::json(&forms)),
        Commands::Show { form_id } => state
            .registry
            .get(&form_id)
            .await
            .map(|form| CliResult::json(&form)),
        Commands::Analytics { form_id, narrative } => state
            .analytics
            .submissions_report(&form_id, narrative)
            .await
            .map(|report| CliResult::json(&report)),
        Commands::Strategy { form_id } => state
            .analytics
            .compute_strategy(&form_id)
            .await
            .map(|outcome| CliResult::json(&outcome)),
    };

    result.unwrap_or_else(|e| CliResult::error(format!("Error: {}", e)))
}
