//! Unit tests for storage types and builder patterns.
//!
//! Covers input kind parsing, answer value encoding and rendering, and the
//! append-only question set on [`Form`].

use super::*;
use serde_json::json;

// ============================================================================
// InputKind tests
// ============================================================================

#[test]
fn test_input_kind_from_str_canonical() {
    assert_eq!("text".parse::<InputKind>().unwrap(), InputKind::Text);
    assert_eq!("email".parse::<InputKind>().unwrap(), InputKind::Email);
    assert_eq!("number".parse::<InputKind>().unwrap(), InputKind::Number);
    assert_eq!("single_choice".parse::<InputKind>().unwrap(), InputKind::SingleChoice);
    assert_eq!("long-text".parse::<InputKind>().unwrap(), InputKind::LongText);
    assert_eq!("choice_list".parse::<InputKind>().unwrap(), InputKind::ChoiceList);
    assert_eq!("checkbox".parse::<InputKind>().unwrap(), InputKind::Checkbox);
    assert_eq!("Rating".parse::<InputKind>().unwrap(), InputKind::Rating);
}

#[test]
fn test_input_kind_from_str_html_aliases() {
    assert_eq!("radio".parse::<InputKind>().unwrap(), InputKind::SingleChoice);
    assert_eq!("textarea".parse::<InputKind>().unwrap(), InputKind::LongText);
    assert_eq!("select".parse::<InputKind>().unwrap(), InputKind::ChoiceList);
}

#[test]
fn test_input_kind_lenient_defaults_to_text() {
    assert_eq!(InputKind::parse_lenient(None), InputKind::Text);
    assert_eq!(InputKind::parse_lenient(Some("slider")), InputKind::Text);
    assert_eq!(InputKind::parse_lenient(Some("rating")), InputKind::Rating);
}

#[test]
fn test_input_kind_display_round_trips() {
    for kind in [
        InputKind::Text,
        InputKind::SingleChoice,
        InputKind::LongText,
        InputKind::ChoiceList,
        InputKind::Rating,
    ] {
        assert_eq!(kind.to_string().parse::<InputKind>().unwrap(), kind);
    }
}

// ============================================================================
// AnswerValue tests
// ============================================================================

#[test]
fn test_answer_value_deserializes_each_variant() {
    let text: AnswerValue = serde_json::from_value(json!("Yes")).unwrap();
    assert_eq!(text, AnswerValue::Text("Yes".to_string()));

    let number: AnswerValue = serde_json::from_value(json!(5)).unwrap();
    assert!(matches!(number, AnswerValue::Number(_)));

    let list: AnswerValue = serde_json::from_value(json!(["Red", "Blue"])).unwrap();
    assert_eq!(
        list,
        AnswerValue::List(vec!["Red".to_string(), "Blue".to_string()])
    );
}

#[test]
fn test_answer_value_rejects_other_shapes() {
    assert!(serde_json::from_value::<AnswerValue>(json!({"a": 1})).is_err());
    assert!(serde_json::from_value::<AnswerValue>(json!(true)).is_err());
    assert!(serde_json::from_value::<AnswerValue>(json!([1, 2])).is_err());
}

#[test]
fn test_answer_value_distribution_key() {
    assert_eq!(AnswerValue::from("No").distribution_key(), "No");
    assert_eq!(AnswerValue::from(4i64).distribution_key(), "4");

    let float: AnswerValue = serde_json::from_value(json!(4.5)).unwrap();
    assert_eq!(float.distribution_key(), "4.5");

    let list = AnswerValue::from(vec!["Price".to_string(), "Fit".to_string()]);
    assert_eq!(list.distribution_key(), "Price, Fit");
    assert_eq!(list.to_string(), "Price, Fit");
}

#[test]
fn test_answer_value_serializes_untagged() {
    assert_eq!(serde_json::to_value(AnswerValue::from(3i64)).unwrap(), json!(3));
    assert_eq!(
        serde_json::to_value(AnswerValue::from("Too High")).unwrap(),
        json!("Too High")
    );
}

// ============================================================================
// QuestionNode tests
// ============================================================================

#[test]
fn test_question_node_new_defaults() {
    let node = QuestionNode::new("q1", "How comfortable?", InputKind::Rating);
    assert_eq!(node.id, "q1");
    assert!(node.required);
    assert!(!node.is_follow_up);
    assert!(node.parent_question_id.is_none());
    assert!(node.trigger_value.is_none());
    assert_eq!(node.order, 1);
}

#[test]
fn test_question_node_wire_names() {
    let node = QuestionNode::new("q2", "Price?", InputKind::SingleChoice)
        .with_options(["Too High", "Just Right"])
        .with_order(2);
    let value = serde_json::to_value(&node).unwrap();

    assert_eq!(value["questionId"], "q2");
    assert_eq!(value["question"], "Price?");
    assert_eq!(value["inputType"], "single_choice");
    assert_eq!(value["options"], json!(["Too High", "Just Right"]));
    assert_eq!(value["isFollowUp"], false);
    assert!(value["parentQuestionId"].is_null());
}

#[test]
fn test_question_node_as_follow_up() {
    let node = QuestionNode::new("q1_f1", "Why?", InputKind::LongText)
        .with_required(false)
        .as_follow_up_of("q1", AnswerValue::from("Too High"));
    assert!(node.is_follow_up);
    assert_eq!(node.parent_question_id.as_deref(), Some("q1"));
    assert_eq!(node.trigger_value, Some(AnswerValue::from("Too High")));
}

// ============================================================================
// Form tests
// ============================================================================

fn sample_form() -> Form {
    Form::new("ai_test", "Shoe feedback", "Shoes").with_questions(vec![
        QuestionNode::new("q1", "Comfort?", InputKind::Rating).with_order(1),
        QuestionNode::new("q2", "Price?", InputKind::SingleChoice).with_order(2),
    ])
}

#[test]
fn test_form_new_is_active() {
    let form = Form::new("ai_1", "desc", "Title");
    assert!(form.is_active);
    assert_eq!(form.version, 0);
    assert!(form.questions.is_empty());
    assert_eq!(form.created_at, form.updated_at);
}

#[test]
fn test_form_root_questions_skip_follow_ups() {
    let mut form = sample_form();
    let follow_up = QuestionNode::new("q1_f1", "Why?", InputKind::Text)
        .as_follow_up_of("q1", AnswerValue::from(2i64));
    form.append_questions(vec![follow_up], Utc::now()).unwrap();

    let roots: Vec<&str> = form.root_questions().map(|q| q.id.as_str()).collect();
    assert_eq!(roots, vec!["q1", "q2"]);
    assert_eq!(form.questions.len(), 3);
}

#[test]
fn test_form_append_rejects_missing_parent() {
    let mut form = sample_form();
    let before = form.clone();
    let good = QuestionNode::new("q1_f1", "Why?", InputKind::Text)
        .as_follow_up_of("q1", AnswerValue::from("x"));
    let bad = QuestionNode::new("q9_f1", "Why?", InputKind::Text)
        .as_follow_up_of("q9", AnswerValue::from("x"));

    let result = form.append_questions(vec![good, bad], Utc::now());

    assert!(matches!(result, Err(AppError::Validation { .. })));
    assert_eq!(form, before, "Nothing is appended when one parent is missing");
}

#[test]
fn test_form_append_rejects_parent_inside_same_batch() {
    let mut form = sample_form();
    let first = QuestionNode::new("q1_f1", "Why?", InputKind::Text)
        .as_follow_up_of("q1", AnswerValue::from("x"));
    let chained = QuestionNode::new("q1_f1_f1", "Why again?", InputKind::Text)
        .as_follow_up_of("q1_f1", AnswerValue::from("x"));

    let result = form.append_questions(vec![first, chained], Utc::now());
    assert!(result.is_err());
    assert_eq!(form.questions.len(), 2);
}

#[test]
fn test_form_append_bumps_updated_at() {
    let mut form = sample_form();
    let later = form.updated_at + chrono::Duration::seconds(5);
    form.append_questions(Vec::new(), later).unwrap();
    assert_eq!(form.updated_at, later);
}

#[test]
fn test_form_serializes_form_id() {
    let value = serde_json::to_value(sample_form()).unwrap();
    assert_eq!(value["formId"], "ai_test");
    assert_eq!(value["sourceDescription"], "Shoe feedback");
    assert_eq!(value["isActive"], true);
}

// ============================================================================
// Submission / Invocation tests
// ============================================================================

#[test]
fn test_submission_new() {
    let submission = Submission::new("ai_1", vec![Response::new("q1", 5i64)]);
    assert!(!submission.id.is_empty());
    assert_eq!(submission.form_id, "ai_1");
    assert_eq!(submission.responses.len(), 1);
}

#[test]
fn test_invocation_success_and_failure() {
    let ok = Invocation::new("form", json!({"description": "x"}))
        .with_form("ai_1")
        .success(json!({"title": "t"}), 42);
    assert!(ok.success);
    assert_eq!(ok.latency_ms, Some(42));
    assert_eq!(ok.form_id.as_deref(), Some("ai_1"));

    let failed = Invocation::new("report", json!({})).failure("boom", 7);
    assert!(!failed.success);
    assert_eq!(failed.error.as_deref(), Some("boom"));
    assert!(failed.output.is_none());
}
