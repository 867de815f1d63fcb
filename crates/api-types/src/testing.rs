//! Test reading, authoring, submission and attempt payloads.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Answer option as shown to someone taking the test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub id: i32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub id: i32,
    pub text: String,
    pub answers: Vec<AnswerResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResponse {
    pub id: i32,
    pub title: String,
    pub material: i32,
    pub questions: Vec<QuestionResponse>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TestRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub material: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TestPatchRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuestionRequest {
    pub test: i32,
    #[validate(length(min = 1))]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredQuestionResponse {
    pub id: i32,
    pub test: i32,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnswerRequest {
    pub question: i32,
    #[validate(length(min = 1, max = 255))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Answer option as shown to its author, including correctness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredAnswerResponse {
    pub id: i32,
    pub question: i32,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAnswer {
    pub question_id: i32,
    pub selected_answer_id: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitTestRequest {
    pub answers: Vec<UserAnswer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerDetail {
    pub question_id: i32,
    pub question_text: String,
    pub selected_answer_id: i32,
    pub selected_answer_text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitTestResponse {
    pub score: u16,
    pub passed: bool,
    pub details: Vec<AnswerDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAttemptResponse {
    pub id: i32,
    pub user: i32,
    pub test: i32,
    pub score: u16,
    pub passed: bool,
    pub submitted_at: NaiveDateTime,
}
