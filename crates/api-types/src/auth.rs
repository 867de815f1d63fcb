//! Registration, login and user profile payloads.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    /// `student` when omitted.
    #[serde(default)]
    pub role: Option<String>,
    #[validate(length(max = 40))]
    #[serde(default)]
    pub first_name: Option<String>,
    #[validate(length(max = 40))]
    #[serde(default)]
    pub last_name: Option<String>,
    #[validate(length(max = 40))]
    #[serde(default)]
    pub city: Option<String>,
    #[validate(length(min = 1))]
    pub password: String,
    pub password_confirm: String,
}

/// Full replacement of a profile (`PUT`).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserUpdateRequest {
    #[validate(email)]
    pub email: String,
    pub role: String,
    #[validate(length(max = 40))]
    #[serde(default)]
    pub first_name: Option<String>,
    #[validate(length(max = 40))]
    #[serde(default)]
    pub last_name: Option<String>,
    #[validate(length(max = 40))]
    #[serde(default)]
    pub city: Option<String>,
}

/// Partial profile change (`PATCH`).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserPatchRequest {
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<String>,
    #[validate(length(max = 40))]
    pub first_name: Option<String>,
    #[validate(length(max = 40))]
    pub last_name: Option<String>,
    #[validate(length(max = 40))]
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_defaults_optional_fields() {
        let request: RegisterRequest = serde_json::from_str(
            r#"{"email":"student@example.com","password":"pw","password_confirm":"pw"}"#,
        )
        .expect("minimal registration should parse");

        assert!(request.role.is_none());
        assert!(request.city.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn register_request_rejects_malformed_email() {
        let request: RegisterRequest = serde_json::from_str(
            r#"{"email":"not-an-email","password":"pw","password_confirm":"pw"}"#,
        )
        .expect("shape is valid");

        let errors = request.validate().expect_err("email should be rejected");
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn user_response_never_carries_a_password() {
        let response = UserResponse {
            id: 1,
            email: "teacher@example.com".to_string(),
            role: "teacher".to_string(),
            first_name: None,
            last_name: None,
            city: Some("Kazan".to_string()),
        };

        let json = serde_json::to_value(&response).expect("serialize user");

        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "teacher");
    }
}
