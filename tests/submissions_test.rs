//! Integration tests for submission recording

mod common;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

use adaptive_feedback::error::AppError;
use adaptive_feedback::forms::ResponseInput;
use adaptive_feedback::storage::AnswerValue;

use common::Harness;

#[cfg(test)]
mod submit_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_empty_submission_is_accepted() {
        let harness = Harness::new().await;

        let submission = harness.submissions.submit("ai_0001", vec![]).await.unwrap();

        assert!(submission.responses.is_empty());
        let stored = harness.submissions.get(&submission.id).await.unwrap();
        assert!(stored.responses.is_empty());
        assert_eq!(stored.form_id, "ai_0001");
    }

    #[tokio::test]
    async fn test_submission_to_unknown_form_is_accepted() {
        let harness = Harness::new().await;

        let result = harness
            .submissions
            .submit("ai_never_created", vec![ResponseInput::new("q1", "Yes")])
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_answered_at_defaults_to_completion_time() {
        let harness = Harness::new().await;
        let explicit = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        let submission = harness
            .submissions
            .submit(
                "ai_0001",
                vec![
                    ResponseInput::new("q1", 4i64),
                    ResponseInput {
                        answered_at: Some(explicit),
                        ..ResponseInput::new("q2", "Yes")
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(submission.responses[0].answered_at, submission.completed_at);
        assert_eq!(submission.responses[1].answered_at, explicit);
    }

    #[tokio::test]
    async fn test_raw_responses_with_every_answer_shape() {
        let harness = Harness::new().await;

        let submission = harness
            .submissions
            .submit_raw(
                "ai_0001",
                &json!([
                    {"questionId": "q1", "answer": 5},
                    {"questionId": "q2", "answer": "Yes"},
                    {"questionId": "q3", "answer": ["Price", "Fit"]}
                ]),
            )
            .await
            .unwrap();

        let answers: Vec<AnswerValue> = submission
            .responses
            .iter()
            .map(|r| r.answer.clone())
            .collect();
        assert_eq!(
            answers,
            vec![
                AnswerValue::from(5i64),
                AnswerValue::from("Yes"),
                AnswerValue::List(vec!["Price".to_string(), "Fit".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_raw_responses_must_be_a_list() {
        let harness = Harness::new().await;

        let result = harness
            .submissions
            .submit_raw("ai_0001", &json!({"questionId": "q1", "answer": 5}))
            .await;

        match result {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "responses"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_raw_response_without_answer_names_its_index() {
        let harness = Harness::new().await;

        let result = harness
            .submissions
            .submit_raw(
                "ai_0001",
                &json!([{"questionId": "q1", "answer": 1}, {"questionId": "q2"}]),
            )
            .await;

        match result {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "responses[1]"),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(harness.submissions.list("ai_0001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_question_id_is_rejected() {
        let harness = Harness::new().await;

        let result = harness
            .submissions
            .submit("ai_0001", vec![ResponseInput::new("  ", "Yes")])
            .await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}

#[cfg(test)]
mod lookup_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_get_missing_submission() {
        let harness = Harness::new().await;

        let result = harness.submissions.get("missing").await;

        match result {
            Err(AppError::NotFound { resource, .. }) => assert_eq!(resource, "Submission"),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let harness = Harness::new().await;

        let mut ids = Vec::new();
        for answer in ["a", "b", "c"] {
            let submission = harness
                .submissions
                .submit("ai_0001", vec![ResponseInput::new("q1", answer)])
                .await
                .unwrap();
            ids.push(submission.id);
        }
        ids.reverse();

        let listed: Vec<String> = harness
            .submissions
            .list("ai_0001")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();

        assert_eq!(listed, ids);
    }
}
