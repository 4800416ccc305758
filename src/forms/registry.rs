use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::core::{non_blank, to_request};
use super::FormsCore;
use crate::error::{AppError, AppResult, GeneratorError, GeneratorResult};
use crate::generator::{FormDraft, FormRequest, GeneratorRole, OptionsDraft, QuestionDraft};
use crate::storage::{Form, InputKind, QuestionNode, Storage, FOLLOW_UP_ORDER_BASE};

/// Unique-id candidates tried before `generate` gives up.
pub const MAX_ID_ATTEMPTS: u32 = 10;

/// Prefix marking generated form ids.
pub const FORM_ID_PREFIX: &str = "ai_";

/// Title used when the generator gives none.
pub const DEFAULT_FORM_TITLE: &str = "AI Generated Form";

/// Largest number of points a rating scale may expand to.
pub const MAX_RATING_SPAN: i64 = 100;

/// Source of candidate form ids.
pub type IdSource = Arc<dyn Fn() -> String + Send + Sync>;

/// `ai_` followed by 8 random bytes as hex.
pub fn random_form_id() -> String {
    let bytes: [u8; 8] = rand::random();
    format!("{}{}", FORM_ID_PREFIX, hex::encode(bytes))
}

/// Owns form definitions: creation from a description, lookup and listing.
#[derive(Clone)]
pub struct FormRegistry {
    core: FormsCore,
    id_source: IdSource,
}

impl FormRegistry {
    /// Create a registry drawing ids from [`random_form_id`].
    pub fn new(core: FormsCore) -> Self {
        Self {
            core,
            id_source: Arc::new(random_form_id),
        }
    }

    /// Replace the id source.
    pub fn with_id_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.id_source = Arc::new(source);
        self
    }

    /// Generate and persist a form from a free-text description.
    ///
    /// Nothing is stored unless the generator output normalizes cleanly and
    /// an unused id is found.
    pub async fn generate(&self, description: &str) -> AppResult<Form> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::EmptyInput {
                field: "description".to_string(),
            });
        }

        let request = to_request(&FormRequest {
            description: description.to_string(),
        })?;
        let output = self.core.invoke(GeneratorRole::Form, request, None).await?;

        let draft: FormDraft =
            serde_json::from_value(output).map_err(|e| GeneratorError::Malformed {
                message: format!("Form output does not match the expected shape: {}", e),
            })?;
        let questions = normalize_root_questions(draft.questions)?;
        if questions.is_empty() {
            return Err(GeneratorError::Malformed {
                message: "Form output contains no questions".to_string(),
            }
            .into());
        }

        let title = non_blank(draft.title).unwrap_or_else(|| DEFAULT_FORM_TITLE.to_string());
        let form_description = draft.description.unwrap_or_default();

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let form = Form::new((self.id_source)(), description, title.clone())
                .with_description(form_description.clone())
                .with_questions(questions.clone());

            if self.core.storage().create_form_if_absent(&form).await? {
                info!(
                    form_id = %form.id,
                    questions = form.questions.len(),
                    attempt,
                    "Form generated"
                );
                return Ok(form);
            }

            warn!(form_id = %form.id, attempt, "Form id collision, drawing a new id");
        }

        Err(AppError::AllocationExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Get a form by id.
    pub async fn get(&self, form_id: &str) -> AppResult<Form> {
        self.core.require_form(form_id).await
    }

    /// All forms, newest first.
    pub async fn list(&self) -> AppResult<Vec<Form>> {
        Ok(self.core.storage().list_forms().await?)
    }

    /// Retire or reactivate a form.
    pub async fn set_active(&self, form_id: &str, active: bool) -> AppResult<Form> {
        let (form, ()) = self
            .core
            .update_form(form_id, |form| {
                form.is_active = active;
                Ok(())
            })
            .await?;

        debug!(form_id = %form_id, active, "Form active flag set");
        Ok(form)
    }
}

/// Normalize generated root questions.
///
/// Ids fall back to `q<position>` and must be unique. Orders outside
/// `1..1000` fall back to the position.
pub(crate) fn normalize_root_questions(
    drafts: Vec<QuestionDraft>,
) -> GeneratorResult<Vec<QuestionNode>> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::with_capacity(drafts.len());

    for (index, draft) in drafts.into_iter().enumerate() {
        let position = index as i64 + 1;
        let id = non_blank(draft.question_id.clone()).unwrap_or_else(|| format!("q{}", position));
        if !seen.insert(id.clone()) {
            return Err(GeneratorError::Malformed {
                message: format!("Duplicate question id {}", id),
            });
        }

        let order = draft
            .order
            .filter(|order| (1..FOLLOW_UP_ORDER_BASE).contains(order))
            .unwrap_or(position);
        nodes.push(build_question(id, draft, true)?.with_order(order));
    }

    Ok(nodes)
}

/// Build a question node from a draft, leaving order and ancestry unset.
pub(crate) fn build_question(
    id: String,
    draft: QuestionDraft,
    required_by_default: bool,
) -> GeneratorResult<QuestionNode> {
    let prompt = non_blank(draft.question).ok_or_else(|| GeneratorError::Malformed {
        message: format!("Question {} has no prompt", id),
    })?;
    let kind = InputKind::parse_lenient(draft.input_type.as_deref());
    let options = normalize_options(&id, kind, draft.options.as_ref())?;

    let mut node = QuestionNode::new(id, prompt, kind)
        .with_options(options)
        .with_required(draft.required.unwrap_or(required_by_default));
    if let Some(placeholder) = non_blank(draft.placeholder) {
        node = node.with_placeholder(placeholder);
    }
    Ok(node)
}

/// Option labels for a question: lists as-is, rating ranges expanded.
fn normalize_options(
    id: &str,
    kind: InputKind,
    options: Option<&OptionsDraft>,
) -> GeneratorResult<Vec<String>> {
    match options {
        Some(labels @ OptionsDraft::Labels(_)) => Ok(labels.labels().unwrap_or_default()),
        Some(OptionsDraft::Range { min, max }) if kind == InputKind::Rating => {
            expand_rating(id, *min, *max)
        }
        _ => Ok(Vec::new()),
    }
}

/// `min..=max` rendered as labels.
fn expand_rating(id: &str, min: i64, max: i64) -> GeneratorResult<Vec<String>> {
    match max.checked_sub(min) {
        Some(span) if (0..MAX_RATING_SPAN).contains(&span) => {
            Ok((min..=max).map(|point| point.to_string()).collect())
        }
        _ => Err(GeneratorError::Malformed {
            message: format!(
                "Question {} has an invalid rating range {}..{}",
                id, min, max
            ),
        }),
    }
}
