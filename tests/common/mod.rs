//! Shared fixtures for integration tests.
//!
//! `ScriptedGenerator` stands in for the external generator: each role
//! answers from a queue of canned results, falling back to a per-role default.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use adaptive_feedback::error::{GeneratorError, GeneratorResult};
use adaptive_feedback::forms::{
    AnalyticsAggregator, FollowUpOrchestrator, FormLocks, FormRegistry, FormsCore,
    SubmissionRecorder,
};
use adaptive_feedback::generator::{Generator, GeneratorRole};
use adaptive_feedback::storage::SqliteStorage;

/// Create an in-memory storage instance for testing
pub async fn create_test_storage() -> SqliteStorage {
    SqliteStorage::new_in_memory()
        .await
        .expect("Failed to create in-memory storage")
}

type Reply = Box<dyn Fn() -> GeneratorResult<Value> + Send + Sync>;

/// Generator with canned replies per role.
#[derive(Default)]
pub struct ScriptedGenerator {
    queued: Mutex<HashMap<GeneratorRole, VecDeque<GeneratorResult<Value>>>>,
    defaults: Mutex<HashMap<GeneratorRole, Reply>>,
    calls: Mutex<Vec<(GeneratorRole, Value)>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one reply for the next call of `role`.
    pub fn push(&self, role: GeneratorRole, reply: GeneratorResult<Value>) -> &Self {
        self.queued
            .lock()
            .unwrap()
            .entry(role)
            .or_default()
            .push_back(reply);
        self
    }

    /// Reply used once the queue for `role` is empty.
    pub fn always<F>(&self, role: GeneratorRole, reply: F) -> &Self
    where
        F: Fn() -> GeneratorResult<Value> + Send + Sync + 'static,
    {
        self.defaults.lock().unwrap().insert(role, Box::new(reply));
        self
    }

    /// Requests seen so far for `role`.
    pub fn requests(&self, role: GeneratorRole) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn call_count(&self, role: GeneratorRole) -> usize {
        self.requests(role).len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, role: GeneratorRole, request: &Value) -> GeneratorResult<Value> {
        self.calls.lock().unwrap().push((role, request.clone()));

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&role)
            .and_then(|queue| queue.pop_front());
        if let Some(reply) = queued {
            return reply;
        }

        match self.defaults.lock().unwrap().get(&role) {
            Some(reply) => reply(),
            None => Err(GeneratorError::Process {
                code: Some(1),
                message: format!("no scripted reply for {}", role),
            }),
        }
    }
}

/// All form services wired over one storage, lock table and generator.
pub struct Harness {
    pub storage: SqliteStorage,
    pub generator: Arc<ScriptedGenerator>,
    pub core: FormsCore,
    pub registry: FormRegistry,
    pub follow_ups: FollowUpOrchestrator,
    pub submissions: SubmissionRecorder,
    pub analytics: AnalyticsAggregator,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_generator(ScriptedGenerator::new()).await
    }

    pub async fn with_generator(generator: ScriptedGenerator) -> Self {
        let storage = create_test_storage().await;
        let generator = Arc::new(generator);
        let core = FormsCore::new(
            storage.clone(),
            generator.clone(),
            Arc::new(FormLocks::new()),
        );

        Self {
            registry: FormRegistry::new(core.clone()),
            follow_ups: FollowUpOrchestrator::new(core.clone()),
            submissions: SubmissionRecorder::new(storage.clone()),
            analytics: AnalyticsAggregator::new(core.clone()),
            storage,
            generator,
            core,
        }
    }
}

/// Form output with a 1..5 rating question and a Yes/No question.
pub fn rating_and_yes_no_form() -> Value {
    json!({
        "title": "Shoe Store Feedback",
        "description": "Tell us about your visit",
        "questions": [
            {
                "questionId": "q1",
                "question": "How would you rate your visit?",
                "inputType": "rating",
                "options": {"min": 1, "max": 5},
                "order": 1
            },
            {
                "questionId": "q2",
                "question": "Would you recommend us?",
                "inputType": "single_choice",
                "options": ["Yes", "No"],
                "order": 2
            }
        ]
    })
}

/// Follow-up output with `count` text questions.
pub fn follow_up_batch(count: usize) -> Value {
    let questions: Vec<Value> = (1..=count)
        .map(|i| {
            json!({
                "question": format!("Tell us more ({})", i),
                "inputType": "long_text"
            })
        })
        .collect();
    json!({ "followUpQuestions": questions })
}
