use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adaptive_feedback::{
    cli::{execute_command, Cli, Commands},
    config::{Config, GeneratorBackend, LogFormat},
    generator::{CommandGenerator, Generator, PipeGenerator},
    server::{AppState, McpServer},
    storage::SqliteStorage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Adaptive feedback server starting..."
    );

    // Initialize storage
    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    let command = cli.command();
    let generator = build_generator(&config, command == Commands::Serve).await?;

    // Create application state
    let state = Arc::new(AppState::new(config, storage, generator));

    if command != Commands::Serve {
        let result = execute_command(command, &state).await;
        if result.exit_code == 0 {
            println!("{}", result.message);
        } else {
            eprintln!("{}", result.message);
        }
        std::process::exit(result.exit_code);
    }

    // Start MCP server
    let server = McpServer::new(state);

    info!("Server ready, waiting for requests on stdin...");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Build the configured generator backend.
///
/// Pipes are upserted before serving so the first call does not race pipe
/// creation.
async fn build_generator(config: &Config, serving: bool) -> anyhow::Result<Arc<dyn Generator>> {
    match config.generator.backend {
        GeneratorBackend::Command => {
            info!(
                form = %config.generator.commands.form,
                "Using command generator backend"
            );
            Ok(Arc::new(CommandGenerator::new(
                config.generator.commands.clone(),
            )))
        }
        GeneratorBackend::Pipe => {
            let generator = match PipeGenerator::new(
                &config.generator.langbase,
                config.generator.pipes.clone(),
                config.request.clone(),
            ) {
                Ok(g) => {
                    info!(base_url = %config.generator.langbase.base_url, "Langbase client initialized");
                    g
                }
                Err(e) => {
                    error!(error = %e, "Failed to initialize Langbase client");
                    return Err(e.into());
                }
            };

            if serving {
                info!("Ensuring required Langbase pipes exist...");
                if let Err(e) = generator.ensure_pipes().await {
                    error!(error = %e, "Failed to ensure pipes exist");
                    return Err(e.into());
                }
            }

            Ok(Arc::new(generator))
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
