mod common;

use axum::http::StatusCode;
use common::TestApp;
use selfstudy_core::domain::{Actor, AnswerId, QuestionId, Role, Scope, SubmittedAnswer, TestId};
use selfstudy_server::service::SubmissionError;
use serde_json::json;

fn submit_uri(test_id: i64) -> String {
    format!("/testing/tests/{test_id}/submit/")
}

#[tokio::test]
async fn test_correct_answer_passes() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let (test_id, question_id, right, _) = app.seed_sample_test(&teacher).await;

    let (status, body) = app
        .post(
            &submit_uri(test_id),
            Some(&student),
            json!({"answers": [{"question_id": question_id, "selected_answer_id": right}]}),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["score"], 100);
    assert_eq!(body["passed"], true);
    assert_eq!(body["details"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["details"][0]["question_text"], "What is 2+2?");
    assert_eq!(body["details"][0]["selected_answer_text"], "4");
    assert_eq!(body["details"][0]["is_correct"], true);
}

#[tokio::test]
async fn test_wrong_answer_fails() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let (test_id, question_id, _, wrong) = app.seed_sample_test(&teacher).await;

    let (status, body) = app
        .post(
            &submit_uri(test_id),
            Some(&student),
            json!({"answers": [{"question_id": question_id, "selected_answer_id": wrong}]}),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["score"], 0);
    assert_eq!(body["passed"], false);
    assert_eq!(body["details"][0]["is_correct"], false);
}

#[tokio::test]
async fn test_foreign_question_is_rejected_without_attempt() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let (test_id, _, right, _) = app.seed_sample_test(&teacher).await;

    let (status, body) = app
        .post(
            &submit_uri(test_id),
            Some(&student),
            json!({"answers": [{"question_id": 9999, "selected_answer_id": right}]}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_questions");
    assert!(body["detail"].as_str().is_some_and(|detail| detail.contains("9999")));

    let attempts = app
        .state
        .attempts
        .list(Scope::Account(student.id))
        .await
        .expect("listing should succeed");
    assert!(attempts.is_empty());
}

#[tokio::test]
async fn test_every_submission_appends_an_attempt() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let (test_id, question_id, right, wrong) = app.seed_sample_test(&teacher).await;

    for selected in [wrong, right, right] {
        let (status, _) = app
            .post(
                &submit_uri(test_id),
                Some(&student),
                json!({"answers": [{"question_id": question_id, "selected_answer_id": selected}]}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let attempts = app
        .state
        .attempts
        .list(Scope::Account(student.id))
        .await
        .expect("list should succeed");
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts.iter().filter(|attempt| attempt.passed).count(), 2);
}

#[tokio::test]
async fn test_score_counts_unanswered_questions() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let (test_id, first, right, _) = app.seed_sample_test(&teacher).await;
    let second = app.seed_question(&teacher, test_id, "What is 3+3?").await;
    app.seed_answer(&teacher, second, "6", true).await;
    let third = app.seed_question(&teacher, test_id, "What is 4+4?").await;
    app.seed_answer(&teacher, third, "8", true).await;

    let (status, body) = app
        .post(
            &submit_uri(test_id),
            Some(&student),
            json!({"answers": [{"question_id": first, "selected_answer_id": right}]}),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["score"], 33);
    assert_eq!(body["passed"], false);
}

#[tokio::test]
async fn test_answer_from_another_question_is_not_counted() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let (test_id, first, _, _) = app.seed_sample_test(&teacher).await;
    let second = app.seed_question(&teacher, test_id, "What is 3+3?").await;
    let second_right = app.seed_answer(&teacher, second, "6", true).await;

    let (status, body) = app
        .post(
            &submit_uri(test_id),
            Some(&student),
            json!({"answers": [{"question_id": first, "selected_answer_id": second_right}]}),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["score"], 0);
    assert_eq!(body["details"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_test_without_questions_is_rejected() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let (_, _, material_id) = app.seed_material(&teacher).await;

    let (_, test) = app
        .post(
            "/testing/tests/",
            Some(&teacher),
            json!({"title": "Empty", "material": material_id}),
        )
        .await;
    let test_id = common::id_of(&test);

    let (status, body) = app
        .post(&submit_uri(test_id), Some(&student), json!({"answers": []}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "empty_test");
}

#[tokio::test]
async fn test_missing_test_is_not_found() {
    let app = TestApp::new().await;
    let student = app.seed_user("student@example.com", Role::Student).await;

    let (status, body) = app
        .post(&submit_uri(4242), Some(&student), json!({"answers": []}))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let (test_id, _, _, _) = app.seed_sample_test(&teacher).await;

    let (status, body) = app
        .post(
            &submit_uri(test_id),
            Some(&student),
            json!({"answers": [{"question_id": "one"}]}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_anonymous_submission_is_unauthenticated() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let (test_id, question_id, right, _) = app.seed_sample_test(&teacher).await;

    let (status, _) = app
        .post(
            &submit_uri(test_id),
            None,
            json!({"answers": [{"question_id": question_id, "selected_answer_id": right}]}),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_attempt_history_is_scoped() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let other_teacher = app.seed_user("other@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let classmate = app.seed_user("classmate@example.com", Role::Student).await;
    let (test_id, question_id, right, _) = app.seed_sample_test(&teacher).await;

    let answers = json!({"answers": [{"question_id": question_id, "selected_answer_id": right}]});
    let (status, _) = app.post(&submit_uri(test_id), Some(&student), answers).await;
    assert_eq!(status, StatusCode::OK);

    let (status, own) = app.get("/testing/attempts/", Some(&student)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own.as_array().map(Vec::len), Some(1));
    assert_eq!(own[0]["score"], 100);
    let attempt_id = common::id_of(&own[0]);

    let (_, theirs) = app.get("/testing/attempts/", Some(&classmate)).await;
    assert_eq!(theirs.as_array().map(Vec::len), Some(0));

    let (_, owning) = app.get("/testing/attempts/", Some(&teacher)).await;
    assert_eq!(owning.as_array().map(Vec::len), Some(1));

    let (_, foreign) = app.get("/testing/attempts/", Some(&other_teacher)).await;
    assert_eq!(foreign.as_array().map(Vec::len), Some(0));

    let uri = format!("/testing/attempts/{attempt_id}/");
    let (status, _) = app.get(&uri, Some(&teacher)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&uri, Some(&classmate)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submission_commits_graded_attempt() {
    let app = TestApp::new().await;
    let teacher = app.seed_user("teacher@example.com", Role::Teacher).await;
    let student = app.seed_user("student@example.com", Role::Student).await;
    let (test_id, question_id, right, _) = app.seed_sample_test(&teacher).await;
    let actor = Actor::user(student.id, Role::Student);
    let test_id = TestId::new(test_id as i32);

    let outcome = app
        .state
        .submissions
        .submit(
            &actor,
            test_id,
            vec![SubmittedAnswer {
                question_id: QuestionId::new(question_id as i32),
                selected_answer_id: AnswerId::new(right as i32),
            }],
        )
        .await
        .expect("submission should succeed");

    let stored = app
        .state
        .attempts
        .find_by_id(outcome.attempt.id)
        .await
        .expect("lookup should succeed")
        .expect("attempt should be committed");
    assert_eq!(stored.score, outcome.report.score);
    assert!(stored.passed);
    assert_eq!(stored.test_owner_id, teacher.id);

    // The rejected batch rolls back and releases the only pooled connection.
    let err = app
        .state
        .submissions
        .submit(
            &actor,
            test_id,
            vec![SubmittedAnswer {
                question_id: QuestionId::new(9999),
                selected_answer_id: AnswerId::new(right as i32),
            }],
        )
        .await
        .expect_err("foreign question should be rejected");
    assert!(matches!(err, SubmissionError::Grading(_)));

    let attempts = app
        .state
        .attempts
        .list(Scope::Account(student.id))
        .await
        .expect("listing should succeed");
    assert_eq!(attempts.len(), 1);
}
