#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use sea_orm::ConnectOptions;
use selfstudy_core::domain::{PassThreshold, Role, UserId};
use selfstudy_server::{
    api::{AppState, cors_layer, create_router},
    auth::TokenIssuer,
    db,
    repository::NewUser,
};
use serde_json::Value;
use tower::ServiceExt;

pub const ALLOWED_ORIGIN: &str = "http://localhost:3000";

pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
}

/// A seeded account and a bearer token for it.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: UserId,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let db = db::connect_and_migrate(options)
            .await
            .expect("in-memory database should migrate");
        let tokens = TokenIssuer::new("integration-secret", 300, 3_600);
        let state = Arc::new(AppState::new(db, PassThreshold::default(), tokens));

        let cors = cors_layer(&[ALLOWED_ORIGIN.to_string()]).expect("cors origins should parse");

        Self {
            router: create_router(Arc::clone(&state), cors),
            state,
        }
    }

    /// Inserts a user directly, skipping password hashing.
    pub async fn seed_user(&self, email: &str, role: Role) -> TestUser {
        let user = self
            .state
            .users
            .create(NewUser {
                email: email.to_string(),
                password_hash: "unused".to_string(),
                role,
                first_name: None,
                last_name: None,
                city: None,
            })
            .await
            .expect("user should be created");
        let pair = self
            .state
            .tokens
            .issue_pair(user.id)
            .expect("token should be issued");

        TestUser {
            id: user.id,
            token: pair.access,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request should build"))
            .await
            .expect("router should respond");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be json")
        };

        (status, json)
    }

    /// `Access-Control-Allow-Origin` returned for a GET sent from `origin`.
    pub async fn allowed_origin(&self, uri: &str, origin: &str) -> Option<String> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .expect("request should build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");

        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    pub async fn get(&self, uri: &str, user: Option<&TestUser>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, user, None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        user: Option<&TestUser>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.request(Method::POST, uri, user, Some(body)).await
    }

    pub async fn patch(
        &self,
        uri: &str,
        user: Option<&TestUser>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, user, Some(body)).await
    }

    pub async fn put(
        &self,
        uri: &str,
        user: Option<&TestUser>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, user, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: Option<&TestUser>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, user, None).await
    }

    /// Creates course -> section -> material as `author` and returns the ids.
    pub async fn seed_material(&self, author: &TestUser) -> (i64, i64, i64) {
        let (status, course) = self
            .post(
                "/content/courses/",
                Some(author),
                serde_json::json!({"title": "Arithmetic", "description": "Basics"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "course: {course}");
        let course_id = id_of(&course);

        let (status, section) = self
            .post(
                "/content/sections/",
                Some(author),
                serde_json::json!({"title": "Addition", "course": course_id}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "section: {section}");
        let section_id = id_of(&section);

        let (status, material) = self
            .post(
                "/content/materials/",
                Some(author),
                serde_json::json!({
                    "title": "Adding small numbers",
                    "content": "2+2",
                    "section": section_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "material: {material}");

        (course_id, section_id, id_of(&material))
    }

    /// Seeds the "Sample Test": one question "What is 2+2?" with the answers
    /// "4" (correct) and "3". Returns `(test_id, question_id, right, wrong)`.
    pub async fn seed_sample_test(&self, author: &TestUser) -> (i64, i64, i64, i64) {
        let (_, _, material_id) = self.seed_material(author).await;

        let (status, test) = self
            .post(
                "/testing/tests/",
                Some(author),
                serde_json::json!({"title": "Sample Test", "material": material_id}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "test: {test}");
        let test_id = id_of(&test);

        let question_id = self.seed_question(author, test_id, "What is 2+2?").await;
        let right = self.seed_answer(author, question_id, "4", true).await;
        let wrong = self.seed_answer(author, question_id, "3", false).await;

        (test_id, question_id, right, wrong)
    }

    pub async fn seed_question(&self, author: &TestUser, test_id: i64, text: &str) -> i64 {
        let (status, question) = self
            .post(
                "/testing/questions/",
                Some(author),
                serde_json::json!({"test": test_id, "text": text}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "question: {question}");
        id_of(&question)
    }

    pub async fn seed_answer(
        &self,
        author: &TestUser,
        question_id: i64,
        text: &str,
        is_correct: bool,
    ) -> i64 {
        let (status, answer) = self
            .post(
                "/testing/answers/",
                Some(author),
                serde_json::json!({
                    "question": question_id,
                    "text": text,
                    "is_correct": is_correct,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "answer: {answer}");
        id_of(&answer)
    }
}

pub fn id_of(value: &Value) -> i64 {
    value["id"].as_i64().expect("response should carry an id")
}
