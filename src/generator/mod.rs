//! External text-generation capability.
//!
//! Every generator call is a single JSON-in/JSON-out exchange with one of
//! three outcomes: a JSON object payload, a well-formed error payload
//! (`{"error": ...}`), or a transport/parse failure. Two backends are
//! provided: [`CommandGenerator`] runs a child process per call and
//! [`PipeGenerator`] calls Langbase-compatible pipes over HTTP.

mod command;
mod pipe;
mod types;


pub use command::*;
pub use pipe::*;
pub use types::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GeneratorError, GeneratorResult};

/// The four jobs the external generator is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorRole {
    /// Description to form definition.
    Form,
    /// Answered question to follow-up questions.
    FollowUp,
    /// Submissions to narrative report.
    Report,
    /// Submissions to strategic analysis.
    Strategy,
}

impl GeneratorRole {
    /// Whether a successful call is kept in the invocation log.
    ///
    /// Report and strategy requests carry every submission of a form and are
    /// re-run on each analytics read, so only their failures are recorded.
    pub fn logs_success(self) -> bool {
        matches!(self, GeneratorRole::Form | GeneratorRole::FollowUp)
    }
}

impl std::fmt::Display for GeneratorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratorRole::Form => write!(f, "form"),
            GeneratorRole::FollowUp => write!(f, "follow_up"),
            GeneratorRole::Report => write!(f, "report"),
            GeneratorRole::Strategy => write!(f, "strategy"),
        }
    }
}

/// A synchronous JSON-in/JSON-out generation capability.
///
/// Implementations return the payload as a JSON object. Empty output,
/// non-JSON output, reported errors and transport failures all map to
/// distinct [`GeneratorError`] variants.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    /// Run the generator for `role` with the given request payload.
    async fn generate(&self, role: GeneratorRole, request: &Value) -> GeneratorResult<Value>;
}

/// Parse raw generator output into a JSON object.
///
/// The first parseable top-level object in the text wins, so markdown fences
/// and diagnostic lines around the payload are tolerated. An object carrying
/// a non-null `error` member is a reported failure.
pub fn parse_generator_output(output: &str) -> GeneratorResult<Value> {
    if output.trim().is_empty() {
        return Err(GeneratorError::Empty);
    }

    let value = extract_json_object(output).ok_or_else(|| GeneratorError::InvalidOutput {
        message: format!(
            "No JSON object found. First 100 chars: '{}'",
            output.chars().take(100).collect::<String>()
        ),
    })?;

    match value.get("error") {
        None | Some(Value::Null) => Ok(value),
        Some(Value::String(message)) => Err(GeneratorError::Reported {
            message: message.clone(),
        }),
        Some(other) => Err(GeneratorError::Reported {
            message: other.to_string(),
        }),
    }
}

/// Find the first top-level `{...}` span in `text` that parses as a JSON object.
///
/// Braces inside string literals are ignored. Objects nested in a span are
/// never candidates: a span that fails to parse is skipped whole, and an
/// opening brace with no match ends the search.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        let close = matching_brace(bytes, open)?;
        if let Ok(value @ Value::Object(_)) = serde_json::from_str(&text[open..=close]) {
            return Some(value);
        }
        start = close + 1;
    }

    None
}

/// Index of the brace closing the object opened at `open`, if any.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}
