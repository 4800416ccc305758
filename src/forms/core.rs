//! Infrastructure shared by the form components.
//!
//! [`FormsCore`] bundles the storage backend, the external generator and the
//! per-form lock table, and owns the two cross-cutting behaviors every
//! component needs: logged generator calls and serialized form updates.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::FormLocks;
use crate::error::{AppError, AppResult, GeneratorResult, StorageError};
use crate::generator::{Generator, GeneratorRole};
use crate::storage::{Form, Invocation, SqliteStorage, Storage};

/// Compare-and-swap attempts before a form update gives up.
pub const MAX_UPDATE_ATTEMPTS: u32 = 5;

/// Storage, generator and locks shared by all form components.
#[derive(Clone)]
pub struct FormsCore {
    storage: SqliteStorage,
    generator: Arc<dyn Generator>,
    locks: Arc<FormLocks>,
}

impl FormsCore {
    /// Create a new core from its collaborators.
    pub fn new(storage: SqliteStorage, generator: Arc<dyn Generator>, locks: Arc<FormLocks>) -> Self {
        Self {
            storage,
            generator,
            locks,
        }
    }

    /// Get a reference to the storage backend.
    #[inline]
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Get a reference to the per-form lock table.
    #[inline]
    pub fn locks(&self) -> &Arc<FormLocks> {
        &self.locks
    }

    /// Load a form or fail with `NotFound`.
    pub async fn require_form(&self, form_id: &str) -> AppResult<Form> {
        self.storage
            .get_form(form_id)
            .await?
            .ok_or_else(|| AppError::not_found("Form", form_id))
    }

    /// Call the generator and record the call in the invocation log.
    ///
    /// Failures are always recorded; successes only for roles where
    /// [`GeneratorRole::logs_success`] holds. The log write never fails the
    /// call; a storage error there is only reported with `warn!`.
    pub async fn invoke(
        &self,
        role: GeneratorRole,
        request: Value,
        form_id: Option<&str>,
    ) -> GeneratorResult<Value> {
        let start = Instant::now();
        let result = self.generator.generate(role, &request).await;
        let latency = start.elapsed().as_millis() as i64;

        if result.is_ok() && !role.logs_success() {
            debug!(role = %role, latency_ms = latency, "Generator call succeeded, not logged");
            return result;
        }

        let mut invocation = Invocation::new(role.to_string(), request);
        if let Some(id) = form_id {
            invocation = invocation.with_form(id);
        }
        invocation = match &result {
            Ok(output) => invocation.success(output.clone(), latency),
            Err(e) => invocation.failure(e.to_string(), latency),
        };

        if let Err(e) = self.storage.log_invocation(&invocation).await {
            warn!(
                error = %e,
                role = %role,
                "Failed to log generator invocation"
            );
        }

        result
    }

    /// Apply `change` to a freshly read form and store it.
    ///
    /// Runs under the form's lock. The write is a version compare-and-swap,
    /// so a writer outside this process forces a re-read and another attempt.
    /// `change` may run more than once and must not have side effects beyond
    /// the form it is given.
    pub async fn update_form<F, R>(&self, form_id: &str, mut change: F) -> AppResult<(Form, R)>
    where
        F: FnMut(&mut Form) -> AppResult<R>,
    {
        let _guard = self.locks.acquire(form_id).await;

        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let mut form = self.require_form(form_id).await?;
            let outcome = change(&mut form)?;
            form.updated_at = form.updated_at.max(Utc::now());

            if self.storage.update_form(&form).await? {
                form.version += 1;
                return Ok((form, outcome));
            }

            debug!(form_id = %form_id, attempt, "Form version moved on, retrying update");
        }

        Err(StorageError::Conflict {
            form_id: form_id.to_string(),
        }
        .into())
    }
}

/// Serialize a generator request payload.
pub(crate) fn to_request<T: serde::Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal {
        message: format!("Failed to encode generator request: {}", e),
    })
}

/// Trimmed text, or `None` when blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
