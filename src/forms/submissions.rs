use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::storage::{AnswerValue, Response, SqliteStorage, Storage, Submission};

/// One `{questionId, answer}` pair as supplied by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInput {
    pub question_id: String,
    pub answer: AnswerValue,
    /// Defaults to the submission time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
}

impl ResponseInput {
    /// Create a response input without an explicit answer time
    pub fn new(question_id: impl Into<String>, answer: impl Into<AnswerValue>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
            answered_at: None,
        }
    }
}

/// Persists completed response sets.
///
/// Neither the form nor the answered questions are looked up: a submission
/// is accepted as long as its shape is valid.
#[derive(Clone)]
pub struct SubmissionRecorder {
    storage: SqliteStorage,
}

impl SubmissionRecorder {
    /// Create a new recorder
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }

    /// Validate an untyped response list, then record it.
    pub async fn submit_raw(&self, form_id: &str, responses: &Value) -> AppResult<Submission> {
        let items = responses.as_array().ok_or_else(|| {
            AppError::validation(
                "responses",
                "Responses must be a list of {questionId, answer} pairs",
            )
        })?;

        let inputs = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<ResponseInput>(item.clone()).map_err(|e| {
                    AppError::validation(format!("responses[{}]", index), e.to_string())
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        self.submit(form_id, inputs).await
    }

    /// Record a submission completed now.
    pub async fn submit(&self, form_id: &str, inputs: Vec<ResponseInput>) -> AppResult<Submission> {
        if form_id.trim().is_empty() {
            return Err(AppError::validation("formId", "Form id cannot be empty"));
        }
        if let Some(index) = inputs.iter().position(|r| r.question_id.trim().is_empty()) {
            return Err(AppError::validation(
                format!("responses[{}].questionId", index),
                "Question id cannot be empty",
            ));
        }

        let mut submission = Submission::new(form_id, Vec::with_capacity(inputs.len()));
        let completed_at = submission.completed_at;
        submission.responses = inputs
            .into_iter()
            .map(|input| Response {
                question_id: input.question_id,
                answer: input.answer,
                answered_at: input.answered_at.unwrap_or(completed_at),
            })
            .collect();

        self.storage.create_submission(&submission).await?;

        info!(
            submission_id = %submission.id,
            form_id = %form_id,
            responses = submission.responses.len(),
            "Submission recorded"
        );
        Ok(submission)
    }

    /// Get a submission by id.
    pub async fn get(&self, submission_id: &str) -> AppResult<Submission> {
        self.storage
            .get_submission(submission_id)
            .await?
            .ok_or_else(|| AppError::not_found("Submission", submission_id))
    }

    /// Submissions for a form, newest first.
    pub async fn list(&self, form_id: &str) -> AppResult<Vec<Submission>> {
        Ok(self.storage.get_form_submissions(form_id).await?)
    }
}
