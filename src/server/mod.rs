//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state management

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use crate::config::Config;
use crate::forms::{
    AnalyticsAggregator, FollowUpOrchestrator, FormLocks, FormRegistry, FormsCore,
    SubmissionRecorder,
};
use crate::generator::Generator;
use crate::storage::SqliteStorage;

/// Application state shared across handlers.
///
/// Built once at startup and held for the life of the process. Every
/// component shares the same storage pool, generator and per-form lock table.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// SQLite storage backend.
    pub storage: SqliteStorage,
    /// Form creation, lookup and retirement.
    pub registry: FormRegistry,
    /// Answer-time follow-up generation.
    pub follow_ups: FollowUpOrchestrator,
    /// Submission persistence.
    pub submissions: SubmissionRecorder,
    /// Distributions, narrative reports and strategies.
    pub analytics: AnalyticsAggregator,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, storage: SqliteStorage, generator: Arc<dyn Generator>) -> Self {
        tracing::info!(
            backend = ?config.generator.backend,
            database = %config.database.path.display(),
            "AppState initializing"
        );

        let core = FormsCore::new(storage.clone(), generator, Arc::new(FormLocks::new()));

        Self {
            registry: FormRegistry::new(core.clone()),
            follow_ups: FollowUpOrchestrator::new(core.clone()),
            submissions: SubmissionRecorder::new(storage.clone()),
            analytics: AnalyticsAggregator::new(core),
            config,
            storage,
        }
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
