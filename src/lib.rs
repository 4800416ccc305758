//! # Adaptive Feedback
//!
//! An adaptive branching questionnaire engine served over the Model Context
//! Protocol (MCP). Forms are generated from a free-text description, grow
//! follow-up questions while they are being answered, and aggregate their
//! submissions into answer distributions and optional generated reports.
//!
//! ## Features
//!
//! - **Form generation**: description in, normalized form definition out
//! - **Answer-time follow-ups**: generated questions appended under the answered root question
//! - **Submissions**: immutable response sets with text, number or list answers
//! - **Analytics**: deterministic per-question distributions
//! - **Reports**: narrative and strategy generation that never fails a read
//!
//! ## Architecture
//!
//! ```text
//! MCP Client → MCP Server (Rust) → Generator (child process or Langbase pipe)
//!                    ↓
//!              SQLite (Forms, Submissions, Invocation log)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use adaptive_feedback::{Config, AppState, McpServer};
//! use adaptive_feedback::generator::CommandGenerator;
//! use adaptive_feedback::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = SqliteStorage::new(&config.database).await?;
//!     let generator = Arc::new(CommandGenerator::new(config.generator.commands.clone()));
//!     let state = Arc::new(AppState::new(config, storage, generator));
//!     McpServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Command-line interface.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Form registry, follow-up orchestration, submissions and analytics.
pub mod forms;
/// External generator capability and its backends.
pub mod generator;
/// System prompts for the generator roles.
pub mod prompts;
/// MCP server implementation and request handling.
pub mod server;
/// SQLite storage layer for persistence.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, McpServer, SharedState};
