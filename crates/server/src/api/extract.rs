//! 路由共用的请求提取器。

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header::AUTHORIZATION, request::Parts},
};
use selfstudy_core::domain::Actor;
use serde::de::DeserializeOwned;
use validator::Validate;

use super::{error::ApiError, state::AppState};

/// 当前调用者，从可选的 `Authorization: Bearer` 请求头解析。
///
/// 没有请求头时为 [`Actor::Anonymous`]；请求头存在但无法解析到现有用户时返回 401。
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

impl FromRequestParts<Arc<AppState>> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self(Actor::Anonymous));
        };

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::unauthenticated("expected a bearer token"))?;

        let user_id = state.tokens.verify_access(token)?;
        let Some(user) = state.users.find_by_id(user_id).await? else {
            tracing::debug!(%user_id, "token refers to a deleted user");
            return Err(ApiError::unauthenticated("user not found"));
        };

        Ok(Self(Actor::user(user.id, user.role)))
    }
}

/// 反序列化后再按 `validator` 规则校验的 JSON 请求体，两类失败都返回 400。
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// 路径参数。无法解析的 id（非数字或超出范围）不对应任何记录，以统一错误体返回 404。
#[derive(Debug, Clone, Copy)]
pub struct IdPath<T>(pub T);

impl<S, T> FromRequestParts<S> for IdPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::debug!(error = %rejection.body_text(), "unparsable path parameter");
                ApiError::not_found("resource")
            })?;
        Ok(Self(value))
    }
}
