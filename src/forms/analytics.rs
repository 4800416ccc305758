//! Response analytics.
//!
//! Distributions are a pure function of a form and its submissions
//! ([`aggregate`]). Narrative reports and strategic analyses come from the
//! external generator and never fail a read: when generation fails the base
//! result is returned and the failure is logged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::core::to_request;
use super::FormsCore;
use crate::error::AppResult;
use crate::generator::{AnsweredPrompt, DigestSubmission, FeedbackDigest, FormBrief, GeneratorRole};
use crate::storage::{Form, InputKind, Storage, Submission};

/// Answer distribution for one root question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalytics {
    pub question: String,
    pub input_type: InputKind,
    pub options: Vec<String>,
    pub order: i64,
    /// Answer key to number of submissions giving it.
    pub distribution: BTreeMap<String, u64>,
}

/// Aggregated view of a form's submissions. Recomputed on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub total_submissions: u64,
    /// Keyed by question id.
    pub questions: BTreeMap<String, QuestionAnalytics>,
    /// Generated narrative report, when requested and available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<Value>,
}

/// Form header returned alongside analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub form_id: String,
    pub title: String,
    pub description: String,
    pub is_active: bool,
    pub question_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Form> for FormSummary {
    fn from(form: &Form) -> Self {
        Self {
            form_id: form.id.clone(),
            title: form.title.clone(),
            description: form.description.clone(),
            is_active: form.is_active,
            question_count: form.questions.len(),
            created_at: form.created_at,
        }
    }
}

/// Submissions of a form together with their analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionsReport {
    pub form: FormSummary,
    pub analytics: AnalyticsSnapshot,
    /// Newest first.
    pub submissions: Vec<Submission>,
}

/// Result of a strategy request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StrategyOutcome {
    /// No submissions yet; the generator was not called.
    Pending { message: String },
    /// The full strategy object with its main sections lifted out.
    Ready {
        strategy: Value,
        strategies: Vec<Value>,
        metrics: Vec<Value>,
        tasks: Vec<Value>,
    },
    /// The generator failed.
    Unavailable { reason: String },
}

impl StrategyOutcome {
    fn ready(strategy: Value) -> Self {
        let section = |key: &str| match strategy.get(key) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        let strategies = section("strategies");
        let metrics = section("metrics");
        let tasks = section("tasks");

        StrategyOutcome::Ready {
            strategy,
            strategies,
            metrics,
            tasks,
        }
    }
}

/// Count answers per root question.
///
/// Responses to follow-ups or to ids the form does not know are skipped. The
/// result does not depend on the order of `submissions`.
pub fn aggregate(form: &Form, submissions: &[Submission]) -> AnalyticsSnapshot {
    let mut questions: BTreeMap<String, QuestionAnalytics> = BTreeMap::new();
    for node in form.root_questions() {
        questions.entry(node.id.clone()).or_insert_with(|| QuestionAnalytics {
            question: node.prompt.clone(),
            input_type: node.input_kind,
            options: node.options.clone(),
            order: node.order,
            distribution: BTreeMap::new(),
        });
    }

    for submission in submissions {
        for response in &submission.responses {
            if let Some(bucket) = questions.get_mut(&response.question_id) {
                *bucket
                    .distribution
                    .entry(response.answer.distribution_key())
                    .or_insert(0) += 1;
            }
        }
    }

    AnalyticsSnapshot {
        total_submissions: submissions.len() as u64,
        questions,
        narrative: None,
    }
}

/// Render submissions as prompt/answer pairs for the report generators.
pub fn feedback_digest(form: &Form, submissions: &[Submission]) -> FeedbackDigest {
    FeedbackDigest {
        form: FormBrief {
            title: form.title.clone(),
            description: form.description.clone(),
        },
        submissions: submissions
            .iter()
            .map(|submission| DigestSubmission {
                responses: submission
                    .responses
                    .iter()
                    .map(|response| AnsweredPrompt {
                        question: form
                            .question(&response.question_id)
                            .map(|q| q.prompt.clone())
                            .unwrap_or_else(|| response.question_id.clone()),
                        answer: response.answer.clone(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Derives analytics, narrative reports and strategies for a form.
#[derive(Clone)]
pub struct AnalyticsAggregator {
    core: FormsCore,
}

impl AnalyticsAggregator {
    /// Create a new aggregator
    pub fn new(core: FormsCore) -> Self {
        Self { core }
    }

    /// Distribution statistics for a form.
    pub async fn compute_analytics(&self, form_id: &str) -> AppResult<AnalyticsSnapshot> {
        let (form, submissions) = self.load(form_id).await?;
        Ok(aggregate(&form, &submissions))
    }

    /// Narrative report for a form, or `None` when there are no submissions
    /// or generation failed.
    pub async fn compute_narrative_report(&self, form_id: &str) -> AppResult<Option<Value>> {
        let (form, submissions) = self.load(form_id).await?;
        self.narrative(&form, &submissions).await
    }

    /// Form summary, analytics and submissions in one read.
    pub async fn submissions_report(
        &self,
        form_id: &str,
        include_narrative: bool,
    ) -> AppResult<SubmissionsReport> {
        let (form, submissions) = self.load(form_id).await?;

        let mut analytics = aggregate(&form, &submissions);
        if include_narrative {
            analytics.narrative = self.narrative(&form, &submissions).await?;
        }

        Ok(SubmissionsReport {
            form: FormSummary::from(&form),
            analytics,
            submissions,
        })
    }

    /// Strategic analysis of a form's submissions.
    pub async fn compute_strategy(&self, form_id: &str) -> AppResult<StrategyOutcome> {
        let (form, submissions) = self.load(form_id).await?;
        if submissions.is_empty() {
            return Ok(StrategyOutcome::Pending {
                message: "No submissions yet. Strategy analysis runs once feedback arrives."
                    .to_string(),
            });
        }

        let request = to_request(&feedback_digest(&form, &submissions))?;
        match self
            .core
            .invoke(GeneratorRole::Strategy, request, Some(&form.id))
            .await
        {
            Ok(strategy) => {
                info!(form_id = %form.id, submissions = submissions.len(), "Strategy generated");
                Ok(StrategyOutcome::ready(strategy))
            }
            Err(e) => {
                warn!(form_id = %form.id, error = %e, "Strategy generation failed");
                Ok(StrategyOutcome::Unavailable {
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn load(&self, form_id: &str) -> AppResult<(Form, Vec<Submission>)> {
        let form = self.core.require_form(form_id).await?;
        let submissions = self.core.storage().get_form_submissions(form_id).await?;
        Ok((form, submissions))
    }

    async fn narrative(&self, form: &Form, submissions: &[Submission]) -> AppResult<Option<Value>> {
        if submissions.is_empty() {
            return Ok(None);
        }

        let request = to_request(&feedback_digest(form, submissions))?;
        match self
            .core
            .invoke(GeneratorRole::Report, request, Some(&form.id))
            .await
        {
            Ok(report) => Ok(Some(report)),
            Err(e) => {
                warn!(form_id = %form.id, error = %e, "Narrative report generation failed");
                Ok(None)
            }
        }
    }
}
