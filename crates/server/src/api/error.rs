//! 统一的 API 错误响应。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use selfstudy_api_types::ErrorResponse;
use selfstudy_core::domain::{AccessError, DomainError, GradingError};
use validator::ValidationErrors;

use crate::{auth::TokenError, service::SubmissionError};

/// API 错误类型，渲染为 `{"code", "detail"}`。
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            code,
            detail: detail.into(),
        }
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", detail)
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
    }

    pub fn unauthenticated(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthenticated", detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code.to_string(),
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => Self::unauthenticated(err.to_string()),
            AccessError::Forbidden => {
                Self::new(StatusCode::FORBIDDEN, "forbidden", err.to_string())
            }
        }
    }
}

impl From<GradingError> for ApiError {
    fn from(err: GradingError) -> Self {
        let code = match err {
            GradingError::InvalidQuestionReference(_) => "invalid_questions",
            GradingError::EmptyTest => "empty_test",
        };
        Self::new(StatusCode::BAD_REQUEST, code, err.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encode(_) => Self::from(anyhow::Error::new(err)),
            TokenError::Invalid | TokenError::WrongKind { .. } => {
                Self::unauthenticated(err.to_string())
            }
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Access(err) => err.into(),
            SubmissionError::TestNotFound(_) => Self::not_found("test"),
            SubmissionError::Grading(err) => err.into(),
            SubmissionError::Store(err) => err.into(),
        }
    }
}

/// 存储等意外错误：记录原因，但不返回给调用者。
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal server error",
        )
    }
}
