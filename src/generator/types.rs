use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::AnswerValue;

// ============================================================================
// Langbase pipe wire types
// ============================================================================

/// Message in a Langbase conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

/// Request to run a Langbase pipe
#[derive(Debug, Clone, Serialize)]
pub struct PipeRequest {
    /// Pipe name (required by Langbase API)
    pub name: String,
    pub messages: Vec<Message>,
    pub stream: bool,
}

/// Response from a Langbase pipe. Other members of the body are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PipeResponse {
    pub success: bool,
    #[serde(default)]
    pub completion: String,
}

/// Request to create (or upsert) a Langbase pipe
#[derive(Debug, Clone, Serialize)]
pub struct CreatePipeRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upsert: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

impl PipeRequest {
    /// Create a new pipe request with name and messages
    pub fn new(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            messages,
            stream: false,
        }
    }
}

impl CreatePipeRequest {
    /// Create a new pipe request with just a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            model: None,
            upsert: None,
            json: None,
            temperature: None,
            messages: None,
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set model (e.g., "openai:gpt-4o-mini")
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Enable upsert (update if exists)
    pub fn with_upsert(mut self, upsert: bool) -> Self {
        self.upsert = Some(upsert);
        self
    }

    /// Enable JSON output mode
    pub fn with_json_output(mut self, json: bool) -> Self {
        self.json = Some(json);
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set system/user messages
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }
}

// ============================================================================
// Generator request payloads
// ============================================================================

/// Form generator request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormRequest {
    pub description: String,
}

/// The question being answered, as sent to the follow-up generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBrief {
    pub question_id: String,
    pub question: String,
    pub input_type: String,
    pub options: Vec<String>,
}

/// One earlier answer given in the same session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(default)]
    pub question: String,
    pub answer: AnswerValue,
}

/// Follow-up generator request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpRequest {
    pub question: QuestionBrief,
    pub answer: AnswerValue,
    pub history: Vec<HistoryEntry>,
}

/// Title and description of the form under analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormBrief {
    pub title: String,
    pub description: String,
}

/// A response rendered with its question prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnsweredPrompt {
    pub question: String,
    pub answer: AnswerValue,
}

/// One submission rendered as prompt/answer pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestSubmission {
    pub responses: Vec<AnsweredPrompt>,
}

/// Aggregated feedback sent to the report and strategy generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackDigest {
    pub form: FormBrief,
    pub submissions: Vec<DigestSubmission>,
}

// ============================================================================
// Generator output drafts
// ============================================================================

/// Form generator output before normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct FormDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
}

/// Follow-up generator output. The list is required but may be empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpDraft {
    pub follow_up_questions: Vec<QuestionDraft>,
}

/// A single generated question before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default, alias = "prompt")]
    pub question: Option<String>,
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub options: Option<OptionsDraft>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
}

/// Options as generated: a list of labels, or a numeric range for ratings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptionsDraft {
    Labels(Vec<Value>),
    Range { min: i64, max: i64 },
    Other(Value),
}

impl OptionsDraft {
    /// Render list entries as labels; strings as-is, anything else as JSON text.
    pub fn labels(&self) -> Option<Vec<String>> {
        match self {
            OptionsDraft::Labels(items) => Some(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}
