//! Integration tests for SQLite storage layer
//!
//! Tests database operations using an in-memory SQLite database, plus one
//! file-backed database to check persistence across reopen.

use chrono::{Duration, Utc};
use serde_json::json;

use adaptive_feedback::config::DatabaseConfig;
use adaptive_feedback::storage::{
    AnswerValue, Form, InputKind, Invocation, QuestionNode, Response, SqliteStorage, Storage,
    Submission,
};

/// Create an in-memory storage instance for testing
async fn create_test_storage() -> SqliteStorage {
    SqliteStorage::new_in_memory()
        .await
        .expect("Failed to create in-memory storage")
}

fn sample_form(id: &str) -> Form {
    Form::new(id, "feedback for a shoe store", "Shoe Store Feedback")
        .with_description("Tell us about your visit")
        .with_questions(vec![
            QuestionNode::new("q1", "How was your visit?", InputKind::Rating)
                .with_options(["1", "2", "3", "4", "5"]),
            QuestionNode::new("q2", "Anything else?", InputKind::LongText)
                .with_order(2)
                .with_required(false)
                .with_placeholder("Optional"),
        ])
}

#[cfg(test)]
mod form_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_form() {
        let storage = create_test_storage().await;
        let form = sample_form("ai_0001");

        assert!(storage.create_form_if_absent(&form).await.unwrap());

        let retrieved = storage.get_form("ai_0001").await.unwrap().unwrap();
        assert_eq!(retrieved.id, form.id);
        assert_eq!(retrieved.title, "Shoe Store Feedback");
        assert_eq!(retrieved.source_description, "feedback for a shoe store");
        assert_eq!(retrieved.questions, form.questions);
        assert!(retrieved.is_active);
        assert_eq!(retrieved.version, 0);
    }

    #[tokio::test]
    async fn test_create_form_id_collision() {
        let storage = create_test_storage().await;

        assert!(storage.create_form_if_absent(&sample_form("ai_0001")).await.unwrap());

        let other = Form::new("ai_0001", "something else", "Other");
        assert!(!storage.create_form_if_absent(&other).await.unwrap());

        let retrieved = storage.get_form("ai_0001").await.unwrap().unwrap();
        assert_eq!(retrieved.title, "Shoe Store Feedback", "First write wins");
    }

    #[tokio::test]
    async fn test_get_nonexistent_form() {
        let storage = create_test_storage().await;

        let result = storage.get_form("ai_missing").await.unwrap();

        assert!(result.is_none(), "Should return None for nonexistent form");
    }

    #[tokio::test]
    async fn test_list_forms_newest_first() {
        let storage = create_test_storage().await;

        let mut older = sample_form("ai_old");
        older.created_at = Utc::now() - Duration::hours(1);
        storage.create_form_if_absent(&older).await.unwrap();
        storage.create_form_if_absent(&sample_form("ai_new")).await.unwrap();

        let ids: Vec<String> = storage
            .list_forms()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();

        assert_eq!(ids, vec!["ai_new".to_string(), "ai_old".to_string()]);
    }

    #[tokio::test]
    async fn test_update_form_bumps_version() {
        let storage = create_test_storage().await;
        let mut form = sample_form("ai_0001");
        storage.create_form_if_absent(&form).await.unwrap();

        form.is_active = false;
        assert!(storage.update_form(&form).await.unwrap());

        let retrieved = storage.get_form("ai_0001").await.unwrap().unwrap();
        assert!(!retrieved.is_active);
        assert_eq!(retrieved.version, 1);
    }

    #[tokio::test]
    async fn test_update_form_with_stale_version_is_rejected() {
        let storage = create_test_storage().await;
        let form = sample_form("ai_0001");
        storage.create_form_if_absent(&form).await.unwrap();

        let mut first = form.clone();
        first.title = "First".to_string();
        assert!(storage.update_form(&first).await.unwrap());

        let mut stale = form.clone();
        stale.title = "Stale".to_string();
        assert!(!storage.update_form(&stale).await.unwrap());

        let retrieved = storage.get_form("ai_0001").await.unwrap().unwrap();
        assert_eq!(retrieved.title, "First");
        assert_eq!(retrieved.version, 1);
    }

    #[tokio::test]
    async fn test_update_missing_form_returns_false() {
        let storage = create_test_storage().await;

        let updated = storage.update_form(&sample_form("ai_ghost")).await.unwrap();

        assert!(!updated);
    }

    #[tokio::test]
    async fn test_follow_up_nodes_round_trip() {
        let storage = create_test_storage().await;
        let mut form = sample_form("ai_0001");
        storage.create_form_if_absent(&form).await.unwrap();

        let follow_up = QuestionNode::new("q1_f1", "What went wrong?", InputKind::LongText)
            .with_order(1001)
            .with_required(false)
            .as_follow_up_of("q1", AnswerValue::from(2i64));
        form.append_questions(vec![follow_up.clone()], Utc::now())
            .unwrap();
        assert!(storage.update_form(&form).await.unwrap());

        let retrieved = storage.get_form("ai_0001").await.unwrap().unwrap();
        assert_eq!(retrieved.questions.len(), 3);
        assert_eq!(retrieved.question("q1_f1"), Some(&follow_up));
    }
}

#[cfg(test)]
mod submission_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_submission() {
        let storage = create_test_storage().await;
        let submission = Submission::new(
            "ai_0001",
            vec![
                Response::new("q1", 5i64),
                Response::new("q2", "Great staff"),
                Response::new("q3", vec!["Price".to_string(), "Fit".to_string()]),
            ],
        );

        storage.create_submission(&submission).await.unwrap();

        let retrieved = storage
            .get_submission(&submission.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retrieved.form_id, "ai_0001");
        assert_eq!(retrieved.responses.len(), 3);
        assert_eq!(retrieved.responses[0].answer, AnswerValue::from(5i64));
        assert_eq!(retrieved.responses[1].answer, AnswerValue::from("Great staff"));
        assert_eq!(
            retrieved.responses[2].answer,
            AnswerValue::List(vec!["Price".to_string(), "Fit".to_string()])
        );
    }

    #[tokio::test]
    async fn test_get_nonexistent_submission() {
        let storage = create_test_storage().await;

        let result = storage.get_submission("missing").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_form_submissions_newest_first_and_scoped() {
        let storage = create_test_storage().await;

        let mut first = Submission::new("ai_0001", vec![Response::new("q1", 1i64)]);
        first.completed_at = Utc::now() - Duration::minutes(5);
        let second = Submission::new("ai_0001", vec![Response::new("q1", 2i64)]);
        let other_form = Submission::new("ai_0002", vec![Response::new("q1", 3i64)]);

        storage.create_submission(&first).await.unwrap();
        storage.create_submission(&second).await.unwrap();
        storage.create_submission(&other_form).await.unwrap();

        let ids: Vec<String> = storage
            .get_form_submissions("ai_0001")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();

        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_empty_submission_is_stored() {
        let storage = create_test_storage().await;
        let submission = Submission::new("ai_0001", vec![]);

        storage.create_submission(&submission).await.unwrap();

        let retrieved = storage.get_submission(&submission.id).await.unwrap().unwrap();
        assert!(retrieved.responses.is_empty());
    }
}

#[cfg(test)]
mod invocation_tests {
    use super::*;

    #[tokio::test]
    async fn test_log_and_read_invocations() {
        let storage = create_test_storage().await;

        let ok = Invocation::new("follow_up", json!({"answer": 2}))
            .with_form("ai_0001")
            .success(json!({"followUpQuestions": []}), 120);
        let failed = Invocation::new("report", json!({"form": {}}))
            .with_form("ai_0001")
            .failure("Generator returned empty output", 40);
        let unrelated = Invocation::new("form", json!({"description": "x"})).success(json!({}), 10);

        storage.log_invocation(&ok).await.unwrap();
        storage.log_invocation(&failed).await.unwrap();
        storage.log_invocation(&unrelated).await.unwrap();

        let logged = storage.get_form_invocations("ai_0001").await.unwrap();
        assert_eq!(logged.len(), 2);

        assert_eq!(logged[0].role, "follow_up");
        assert!(logged[0].success);
        assert_eq!(logged[0].output, Some(json!({"followUpQuestions": []})));
        assert_eq!(logged[0].latency_ms, Some(120));

        assert_eq!(logged[1].role, "report");
        assert!(!logged[1].success);
        assert_eq!(
            logged[1].error.as_deref(),
            Some("Generator returned empty output")
        );
        assert!(logged[1].output.is_none());
    }
}

#[cfg(test)]
mod file_database_tests {
    use super::*;

    #[tokio::test]
    async fn test_file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("nested").join("feedback.db"),
            max_connections: 2,
        };

        {
            let storage = SqliteStorage::new(&config).await.unwrap();
            storage
                .create_form_if_absent(&sample_form("ai_0001"))
                .await
                .unwrap();
            storage.pool().close().await;
        }

        let reopened = SqliteStorage::new(&config).await.unwrap();
        let form = reopened.get_form("ai_0001").await.unwrap();

        assert!(form.is_some(), "Form should survive a reopen");
        assert!(config.path.exists());
    }

    #[tokio::test]
    async fn test_memory_path_uses_in_memory_database() {
        let config = DatabaseConfig {
            path: ":memory:".into(),
            max_connections: 5,
        };

        let storage = SqliteStorage::new(&config).await.unwrap();

        assert!(storage.list_forms().await.unwrap().is_empty());
    }
}
