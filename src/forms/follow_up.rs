use chrono::Utc;
use tracing::{debug, info};

use super::core::to_request;
use super::registry::build_question;
use super::FormsCore;
use crate::error::{AppError, AppResult, GeneratorError, GeneratorResult};
use crate::generator::{
    FollowUpDraft, FollowUpRequest, GeneratorRole, HistoryEntry, QuestionBrief, QuestionDraft,
};
use crate::storage::{AnswerValue, QuestionNode, FOLLOW_UP_ORDER_BASE};

/// Grows a form at answer time by appending generated follow-up questions.
#[derive(Clone)]
pub struct FollowUpOrchestrator {
    core: FormsCore,
}

impl FollowUpOrchestrator {
    /// Create a new orchestrator
    pub fn new(core: FormsCore) -> Self {
        Self { core }
    }

    /// Generate follow-ups for an answered root question and append them.
    ///
    /// Answers to follow-up questions generate nothing. Repeating a call with
    /// the same answer appends another batch; ids within a batch run
    /// `<question_id>_f1`, `<question_id>_f2`, ... and restart per call.
    pub async fn on_answer(
        &self,
        form_id: &str,
        question_id: &str,
        answer: AnswerValue,
        history: Vec<HistoryEntry>,
    ) -> AppResult<Vec<QuestionNode>> {
        if question_id.trim().is_empty() {
            return Err(AppError::validation(
                "questionId",
                "Question id cannot be empty",
            ));
        }

        let form = self.core.require_form(form_id).await?;
        let question = form
            .question(question_id)
            .ok_or_else(|| AppError::not_found("Question", question_id))?;

        if question.is_follow_up {
            debug!(
                form_id = %form_id,
                question_id = %question_id,
                "Answer to a follow-up question, nothing to generate"
            );
            return Ok(Vec::new());
        }

        let request = to_request(&FollowUpRequest {
            question: QuestionBrief {
                question_id: question.id.clone(),
                question: question.prompt.clone(),
                input_type: question.input_kind.to_string(),
                options: question.options.clone(),
            },
            answer: answer.clone(),
            history,
        })?;

        let nodes = self
            .generate_follow_ups(form_id, question_id, &answer, request)
            .await
            .map_err(|source| AppError::FollowUpGeneration {
                question_id: question_id.to_string(),
                source,
            })?;

        if nodes.is_empty() {
            debug!(form_id = %form_id, question_id = %question_id, "No follow-ups generated");
            return Ok(nodes);
        }

        let now = Utc::now();
        self.core
            .update_form(form_id, |form| form.append_questions(nodes.clone(), now))
            .await?;

        info!(
            form_id = %form_id,
            question_id = %question_id,
            count = nodes.len(),
            "Follow-up questions appended"
        );
        Ok(nodes)
    }

    async fn generate_follow_ups(
        &self,
        form_id: &str,
        question_id: &str,
        answer: &AnswerValue,
        request: serde_json::Value,
    ) -> GeneratorResult<Vec<QuestionNode>> {
        let output = self
            .core
            .invoke(GeneratorRole::FollowUp, request, Some(form_id))
            .await?;
        let draft: FollowUpDraft =
            serde_json::from_value(output).map_err(|e| GeneratorError::Malformed {
                message: format!("Follow-up output does not match the expected shape: {}", e),
            })?;

        normalize_follow_ups(question_id, answer, draft.follow_up_questions)
    }
}

/// Normalize generated follow-ups for `parent_id`.
///
/// The k-th item (1-based) becomes `<parent_id>_f<k>` with order `1000 + k`.
/// Generator-supplied ids and orders are ignored.
pub(crate) fn normalize_follow_ups(
    parent_id: &str,
    trigger: &AnswerValue,
    drafts: Vec<QuestionDraft>,
) -> GeneratorResult<Vec<QuestionNode>> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| {
            let k = index as i64 + 1;
            let node = build_question(format!("{}_f{}", parent_id, k), draft, false)?;
            Ok(node
                .with_order(FOLLOW_UP_ORDER_BASE + k)
                .as_follow_up_of(parent_id, trigger.clone()))
        })
        .collect()
}
