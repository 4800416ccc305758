use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::{parse_generator_output, Generator, GeneratorRole};
use crate::config::CommandConfig;
use crate::error::{GeneratorError, GeneratorResult};

/// Longest stderr excerpt carried in a process error.
const STDERR_EXCERPT: usize = 2000;

/// Generator that runs one child process per call.
///
/// The request JSON is written to the child's stdin; the first JSON object on
/// its stdout is the result. A non-zero exit status is a process failure.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    commands: CommandConfig,
    working_dir: Option<PathBuf>,
}

impl CommandGenerator {
    /// Create a new command generator
    pub fn new(commands: CommandConfig) -> Self {
        Self {
            commands,
            working_dir: None,
        }
    }

    /// Run every command from `dir`
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Command line configured for a role
    pub fn command_line(&self, role: GeneratorRole) -> &str {
        match role {
            GeneratorRole::Form => &self.commands.form,
            GeneratorRole::FollowUp => &self.commands.follow_up,
            GeneratorRole::Report => &self.commands.report,
            GeneratorRole::Strategy => &self.commands.strategy,
        }
    }

    async fn run(&self, role: GeneratorRole, input: &[u8]) -> GeneratorResult<String> {
        let line = self.command_line(role);
        let mut parts = line.split_whitespace();
        let program = parts.next().ok_or_else(|| GeneratorError::Process {
            code: None,
            message: format!("No command configured for {} generator", role),
        })?;

        let mut command = Command::new(program);
        command
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        debug!(role = %role, command = %line, "Spawning generator process");

        let mut child = command.spawn().map_err(|e| GeneratorError::Process {
            code: None,
            message: format!("Failed to spawn '{}': {}", program, e),
        })?;

        // stdin is fed while stdout and stderr drain, so a child that writes
        // before it reads cannot fill a pipe and stall both sides.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // A child that exits without reading stdin closes the pipe; its
                // exit status decides the outcome, not the write error.
                if let Err(e) = stdin.write_all(input).await {
                    warn!(role = %role, error = %e, "Generator process did not accept input");
                }
            }
        };

        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| GeneratorError::Process {
            code: None,
            message: format!("Failed to collect output: {}", e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GeneratorError::Process {
                code: output.status.code(),
                message: stderr.chars().take(STDERR_EXCERPT).collect(),
            });
        }

        if !output.stderr.is_empty() {
            debug!(
                role = %role,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Generator process wrote diagnostics"
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Generator for CommandGenerator {
    async fn generate(&self, role: GeneratorRole, request: &Value) -> GeneratorResult<Value> {
        let start = Instant::now();
        let input = request.to_string();

        let result = self
            .run(role, input.as_bytes())
            .await
            .and_then(|stdout| parse_generator_output(&stdout));

        match &result {
            Ok(_) => info!(
                role = %role,
                latency_ms = start.elapsed().as_millis(),
                "Generator process succeeded"
            ),
            Err(e) => error!(
                role = %role,
                error = %e,
                latency_ms = start.elapsed().as_millis(),
                "Generator process failed"
            ),
        }

        result
    }
}
