//! Storage layer for form persistence.
//!
//! This module defines the persisted documents (forms with their question
//! nodes, submissions, generator invocation logs) and the [`Storage`] trait,
//! with a SQLite-backed implementation in [`SqliteStorage`].

mod sqlite;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult, StorageResult};

/// Render order assigned to the first follow-up of a batch is `FOLLOW_UP_ORDER_BASE + 1`.
///
/// Root questions always sort below this value.
pub const FOLLOW_UP_ORDER_BASE: i64 = 1000;

/// A feedback form generated from a free-text description.
///
/// The question set only ever grows: follow-ups are appended at answer time
/// and nothing is removed or re-parented afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    /// Opaque unique identifier (`ai_` + hex).
    #[serde(rename = "formId")]
    pub id: String,
    /// The description the form was generated from.
    pub source_description: String,
    /// Form title.
    pub title: String,
    /// Short description shown to respondents.
    pub description: String,
    /// Root and follow-up questions in append order.
    pub questions: Vec<QuestionNode>,
    /// Logical retirement flag.
    pub is_active: bool,
    /// Optimistic concurrency version, bumped on every update.
    pub version: i64,
    /// When the form was created.
    pub created_at: DateTime<Utc>,
    /// When the form was last modified.
    pub updated_at: DateTime<Utc>,
}

/// One question in a form, either a root question or a follow-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionNode {
    /// Question identifier (`q1`, `q1_f2`, ...).
    #[serde(rename = "questionId")]
    pub id: String,
    /// Prompt text.
    #[serde(rename = "question")]
    pub prompt: String,
    /// How the answer is entered.
    #[serde(rename = "inputType")]
    pub input_kind: InputKind,
    /// Option labels, in display order.
    #[serde(default)]
    pub options: Vec<String>,
    /// Whether an answer is required.
    pub required: bool,
    /// Optional input placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Parent question for follow-ups, `None` for roots.
    #[serde(default)]
    pub parent_question_id: Option<String>,
    /// The parent's answer that caused this follow-up to be generated.
    #[serde(default)]
    pub trigger_value: Option<AnswerValue>,
    /// Render sequence.
    pub order: i64,
    /// Whether this node was generated as a follow-up.
    pub is_follow_up: bool,
}

/// Input kind of a question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Short free text.
    #[default]
    Text,
    /// Email address.
    Email,
    /// Numeric entry.
    Number,
    /// Pick exactly one option (radio buttons).
    SingleChoice,
    /// Multi-line free text.
    LongText,
    /// Pick from a dropdown list.
    ChoiceList,
    /// Tick any number of options.
    Checkbox,
    /// Pick a point on a numeric scale.
    Rating,
}

impl InputKind {
    /// Parse an input kind, falling back to [`InputKind::Text`] for anything unknown.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::Text => write!(f, "text"),
            InputKind::Email => write!(f, "email"),
            InputKind::Number => write!(f, "number"),
            InputKind::SingleChoice => write!(f, "single_choice"),
            InputKind::LongText => write!(f, "long_text"),
            InputKind::ChoiceList => write!(f, "choice_list"),
            InputKind::Checkbox => write!(f, "checkbox"),
            InputKind::Rating => write!(f, "rating"),
        }
    }
}

impl std::str::FromStr for InputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "text" => Ok(InputKind::Text),
            "email" => Ok(InputKind::Email),
            "number" => Ok(InputKind::Number),
            "single_choice" | "radio" => Ok(InputKind::SingleChoice),
            "long_text" | "textarea" => Ok(InputKind::LongText),
            "choice_list" | "select" => Ok(InputKind::ChoiceList),
            "checkbox" => Ok(InputKind::Checkbox),
            "rating" => Ok(InputKind::Rating),
            _ => Err(format!("Unknown input kind: {}", s)),
        }
    }
}

/// An answer value: text, a number, or a list of labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Free text or a single option label.
    Text(String),
    /// A numeric answer (ratings, number inputs).
    Number(serde_json::Number),
    /// Several option labels (checkboxes).
    List(Vec<String>),
}

impl AnswerValue {
    /// Render the answer as the key used in distribution buckets.
    pub fn distribution_key(&self) -> String {
        match self {
            AnswerValue::Text(text) => text.clone(),
            AnswerValue::Number(number) => number.to_string(),
            AnswerValue::List(items) => items.join(", "),
        }
    }
}

impl std::fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.distribution_key())
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        AnswerValue::Number(value.into())
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(value: Vec<String>) -> Self {
        AnswerValue::List(value)
    }
}

/// One answered question within a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Question the answer belongs to. Not checked against the form.
    pub question_id: String,
    /// The answer.
    pub answer: AnswerValue,
    /// When the question was answered.
    pub answered_at: DateTime<Utc>,
}

/// One respondent's completed set of responses. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Unique submission identifier.
    pub id: String,
    /// Form the submission was made against.
    pub form_id: String,
    /// Answers in submission order.
    pub responses: Vec<Response>,
    /// When the submission was recorded.
    pub completed_at: DateTime<Utc>,
}

/// Log record of one external generator call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    /// Unique invocation identifier.
    pub id: String,
    /// Form the call was made for, if one exists yet.
    pub form_id: Option<String>,
    /// Generator role (`form`, `follow_up`, `report`, `strategy`).
    pub role: String,
    /// Request payload.
    pub input: serde_json::Value,
    /// Parsed output on success.
    pub output: Option<serde_json::Value>,
    /// Call latency in milliseconds.
    pub latency_ms: Option<i64>,
    /// Whether the call succeeded.
    pub success: bool,
    /// Error message on failure.
    pub error: Option<String>,
    /// When the call was made.
    pub created_at: DateTime<Utc>,
}

impl Form {
    /// Create a new, empty, active form
    pub fn new(
        id: impl Into<String>,
        source_description: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            source_description: source_description.into(),
            title: title.into(),
            description: String::new(),
            questions: Vec::new(),
            is_active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the root question set
    pub fn with_questions(mut self, questions: Vec<QuestionNode>) -> Self {
        self.questions = questions;
        self
    }

    /// Find a question node by id (first match)
    pub fn question(&self, id: &str) -> Option<&QuestionNode> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Iterate root (non follow-up) questions
    pub fn root_questions(&self) -> impl Iterator<Item = &QuestionNode> {
        self.questions.iter().filter(|q| !q.is_follow_up)
    }

    /// Append question nodes, enforcing that every parent already exists.
    ///
    /// Parents are checked against the nodes present before the batch, so a
    /// batch can never reference its own members. On error nothing is appended.
    pub fn append_questions(
        &mut self,
        nodes: Vec<QuestionNode>,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        for node in &nodes {
            if let Some(parent) = &node.parent_question_id {
                if self.question(parent).is_none() {
                    return Err(AppError::validation(
                        "parentQuestionId",
                        format!(
                            "question {} references missing parent {}",
                            node.id, parent
                        ),
                    ));
                }
            }
        }

        self.questions.extend(nodes);
        self.updated_at = at;
        Ok(())
    }
}

impl QuestionNode {
    /// Create a new root question
    pub fn new(id: impl Into<String>, prompt: impl Into<String>, input_kind: InputKind) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            input_kind,
            options: Vec::new(),
            required: true,
            placeholder: None,
            parent_question_id: None,
            trigger_value: None,
            order: 1,
            is_follow_up: false,
        }
    }

    /// Set options
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Set render order
    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    /// Set required flag
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set placeholder
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Mark as a follow-up of `parent_id`, triggered by `trigger`
    pub fn as_follow_up_of(mut self, parent_id: impl Into<String>, trigger: AnswerValue) -> Self {
        self.parent_question_id = Some(parent_id.into());
        self.trigger_value = Some(trigger);
        self.is_follow_up = true;
        self
    }
}

impl Response {
    /// Create a response answered now
    pub fn new(question_id: impl Into<String>, answer: impl Into<AnswerValue>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
            answered_at: Utc::now(),
        }
    }
}

impl Submission {
    /// Create a new submission completed now
    pub fn new(form_id: impl Into<String>, responses: Vec<Response>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            form_id: form_id.into(),
            responses,
            completed_at: Utc::now(),
        }
    }
}

impl Invocation {
    /// Create a new invocation log entry
    pub fn new(role: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            form_id: None,
            role: role.into(),
            input,
            output: None,
            latency_ms: None,
            success: true,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Set form ID
    pub fn with_form(mut self, form_id: impl Into<String>) -> Self {
        self.form_id = Some(form_id.into());
        self
    }

    /// Mark as successful
    pub fn success(mut self, output: serde_json::Value, latency_ms: i64) -> Self {
        self.success = true;
        self.output = Some(output);
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Mark as failed
    pub fn failure(mut self, error: impl Into<String>, latency_ms: i64) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self.latency_ms = Some(latency_ms);
        self
    }
}

/// Storage trait for database operations.
///
/// This trait defines the document-store operations the form engine needs:
/// create, read, compare-and-swap update by id, and query by form id.
#[async_trait]
pub trait Storage: Send + Sync {
    // Form operations

    /// Insert a form unless its id is already taken.
    ///
    /// Returns `false` when the id collided. The check and the insert are a
    /// single statement.
    async fn create_form_if_absent(&self, form: &Form) -> StorageResult<bool>;
    /// Get a form by ID.
    async fn get_form(&self, id: &str) -> StorageResult<Option<Form>>;
    /// List all forms, newest first.
    async fn list_forms(&self) -> StorageResult<Vec<Form>>;
    /// Replace a form if its stored version still equals `form.version`.
    ///
    /// On success the stored version becomes `form.version + 1`. Returns
    /// `false` when the version moved on (or the form is gone).
    async fn update_form(&self, form: &Form) -> StorageResult<bool>;

    // Submission operations

    /// Persist a submission.
    async fn create_submission(&self, submission: &Submission) -> StorageResult<()>;
    /// Get a submission by ID.
    async fn get_submission(&self, id: &str) -> StorageResult<Option<Submission>>;
    /// Get all submissions for a form, newest first.
    async fn get_form_submissions(&self, form_id: &str) -> StorageResult<Vec<Submission>>;

    // Invocation logging

    /// Log a generator invocation for diagnostics.
    async fn log_invocation(&self, invocation: &Invocation) -> StorageResult<()>;
    /// Get invocations recorded against a form, oldest first.
    async fn get_form_invocations(&self, form_id: &str) -> StorageResult<Vec<Invocation>>;
}
