use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::SharedState;
use crate::error::{McpError, McpResult};
use crate::generator::HistoryEntry;
use crate::storage::AnswerValue;

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        // Form registry
        "forms_generate" => handle_generate(state, arguments).await,
        "forms_get" => handle_get(state, arguments).await,
        "forms_list" => handle_list(state).await,
        "forms_set_active" => handle_set_active(state, arguments).await,
        // Answer time
        "forms_follow_up" => handle_follow_up(state, arguments).await,
        "forms_submit" => handle_submit(state, arguments).await,
        "forms_submission_get" => handle_submission_get(state, arguments).await,
        // Analytics
        "forms_submissions" => handle_submissions(state, arguments).await,
        "forms_strategy" => handle_strategy(state, arguments).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct GenerateParams {
    description: String,
}

#[derive(Debug, Deserialize)]
struct FormIdParams {
    form_id: String,
}

#[derive(Debug, Deserialize)]
struct SetActiveParams {
    form_id: String,
    active: bool,
}

#[derive(Debug, Deserialize)]
struct FollowUpParams {
    form_id: String,
    question_id: String,
    answer: AnswerValue,
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct SubmitParams {
    form_id: String,
    responses: Value,
}

#[derive(Debug, Deserialize)]
struct SubmissionIdParams {
    submission_id: String,
}

#[derive(Debug, Deserialize)]
struct SubmissionsParams {
    form_id: String,
    #[serde(default)]
    narrative: bool,
}

/// Follow-ups created for one answer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FollowUpResult {
    follow_up_questions: Vec<crate::storage::QuestionNode>,
}

/// Handle forms_generate tool call
async fn handle_generate(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("forms_generate", arguments, |params: GenerateParams| async move {
        state.registry.generate(&params.description).await
    })
    .await
}

/// Handle forms_get tool call
async fn handle_get(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("forms_get", arguments, |params: FormIdParams| async move {
        state.registry.get(&params.form_id).await
    })
    .await
}

/// Handle forms_list - takes no arguments
async fn handle_list(state: &SharedState) -> McpResult<Value> {
    let forms = state
        .registry
        .list()
        .await
        .map_err(|e| McpError::ExecutionFailed {
            message: e.to_string(),
        })?;

    Ok(serde_json::json!({
        "count": forms.len(),
        "forms": serde_json::to_value(forms)?,
    }))
}

/// Handle forms_set_active tool call
async fn handle_set_active(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("forms_set_active", arguments, |params: SetActiveParams| async move {
        state
            .registry
            .set_active(&params.form_id, params.active)
            .await
    })
    .await
}

/// Handle forms_follow_up tool call
async fn handle_follow_up(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("forms_follow_up", arguments, |params: FollowUpParams| async move {
        state
            .follow_ups
            .on_answer(
                &params.form_id,
                &params.question_id,
                params.answer,
                params.history,
            )
            .await
            .map(|follow_up_questions| FollowUpResult {
                follow_up_questions,
            })
    })
    .await
}

/// Handle forms_submit tool call
async fn handle_submit(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("forms_submit", arguments, |params: SubmitParams| async move {
        state
            .submissions
            .submit_raw(&params.form_id, &params.responses)
            .await
    })
    .await
}

/// Handle forms_submission_get tool call
async fn handle_submission_get(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler(
        "forms_submission_get",
        arguments,
        |params: SubmissionIdParams| async move { state.submissions.get(&params.submission_id).await },
    )
    .await
}

/// Handle forms_submissions tool call
async fn handle_submissions(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("forms_submissions", arguments, |params: SubmissionsParams| async move {
        state
            .analytics
            .submissions_report(&params.form_id, params.narrative)
            .await
    })
    .await
}

/// Handle forms_strategy tool call
async fn handle_strategy(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("forms_strategy", arguments, |params: FormIdParams| async move {
        state.analytics.compute_strategy(&params.form_id).await
    })
    .await
}

/// Parse tool arguments into a typed parameter struct.
fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}

/// Generic handler that executes a form operation with consistent error handling.
///
/// Parses the arguments into `P`, runs the operation, converts its error to
/// [`McpError::ExecutionFailed`] and serializes the result.
async fn execute_handler<P, R, E, F, Fut>(
    tool_name: &str,
    arguments: Option<Value>,
    operation: F,
) -> McpResult<Value>
where
    P: serde::de::DeserializeOwned,
    R: Serialize,
    E: std::fmt::Display,
    F: FnOnce(P) -> Fut,
    Fut: std::future::Future<Output = Result<R, E>>,
{
    let params: P = parse_arguments(tool_name, arguments)?;

    let result = operation(params)
        .await
        .map_err(|e| McpError::ExecutionFailed {
            message: e.to_string(),
        })?;

    serde_json::to_value(result).map_err(McpError::Json)
}
