//! 用户注册、账户维护与令牌签发 API 路由。

use std::{str::FromStr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use selfstudy_api_types::auth::{
    AccessTokenResponse, LoginRequest, RefreshRequest, RegisterRequest, TokenPairResponse,
    UserPatchRequest, UserResponse, UserUpdateRequest,
};
use selfstudy_core::domain::{
    AccessError, Action, Actor, Resource, Role, Target, UserId, authorize, scope,
};
use tracing::info;

use super::{
    error::ApiError,
    extract::{CurrentActor, IdPath, ValidJson},
    state::AppState,
};
use crate::{
    auth::{hash_password, verify_password},
    repository::{NewUser, UserChanges, UserRecord},
};

/// 创建认证 API 路由。
pub fn create_auth_router() -> Router<Arc<AppState>> {
    Router::new()
        // 用户列表与注册
        .route("/authentication/register/", get(list_users).post(register))
        // 单个用户
        .route(
            "/authentication/register/{id}/",
            get(retrieve_user)
                .put(update_user)
                .patch(partial_update_user)
                .delete(destroy_user),
        )
        // 登录
        .route("/authentication/login/", post(login))
        // 刷新访问令牌
        .route("/authentication/token/refresh/", post(refresh_token))
}

/// 用户响应，不含密码字段。
fn user_response(user: UserRecord) -> UserResponse {
    UserResponse {
        id: user.id.value(),
        email: user.email,
        role: user.role.to_string(),
        first_name: user.first_name,
        last_name: user.last_name,
        city: user.city,
    }
}

/// 解析注册时请求的角色，并校验调用者可以授予它。
fn requested_role(actor: &Actor, raw: &str) -> Result<Role, ApiError> {
    let role = Role::from_str(raw)?;
    if !role.is_self_assignable() && !actor.is_admin() {
        return Err(ApiError::validation(format!("role \"{role}\" cannot be selected")));
    }
    Ok(role)
}

/// 邮箱已被占用时返回校验错误。
async fn ensure_email_free(
    state: &AppState,
    email: &str,
    except: Option<UserId>,
) -> Result<(), ApiError> {
    match state.users.find_by_email(email).await? {
        Some(existing) if Some(existing.id) != except => {
            Err(ApiError::validation("user with this email already exists"))
        }
        _ => Ok(()),
    }
}

/// 查找调用者可见的用户，其他用户一律返回 404。
async fn visible_user(
    state: &AppState,
    actor: &Actor,
    id: UserId,
) -> Result<UserRecord, ApiError> {
    authorize(actor, Action::Retrieve, &Target::collection(Resource::User))?;

    match state.users.find_by_id(id).await? {
        Some(user) if scope(actor, Resource::User).contains(&Target::user(user.id)) => Ok(user),
        _ => Err(ApiError::not_found("user")),
    }
}

/// 注册新用户。
async fn register(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    authorize(&actor, Action::Create, &Target::collection(Resource::User))?;

    if request.password != request.password_confirm {
        return Err(ApiError::validation("password fields didn't match"));
    }

    let role = match request.role.as_deref() {
        Some(raw) => requested_role(&actor, raw)?,
        None => Role::default(),
    };
    ensure_email_free(&state, &request.email, None).await?;

    let user = state
        .users
        .create(NewUser {
            email: request.email,
            password_hash: hash_password(&request.password)?,
            role,
            first_name: request.first_name,
            last_name: request.last_name,
            city: request.city,
        })
        .await?;

    info!(user_id = %user.id, role = %user.role, "user registered");
    Ok((StatusCode::CREATED, Json(user_response(user))))
}

/// 列出用户。
async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    authorize(&actor, Action::List, &Target::collection(Resource::User))?;

    let users = state.users.list(scope(&actor, Resource::User)).await?;
    Ok(Json(users.into_iter().map(user_response).collect()))
}

/// 获取用户详情。
async fn retrieve_user(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = visible_user(&state, &actor, UserId::new(id)).await?;
    Ok(Json(user_response(user)))
}

/// 整体更新用户。
async fn update_user(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
    ValidJson(request): ValidJson<UserUpdateRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = visible_user(&state, &actor, UserId::new(id)).await?;
    authorize(&actor, Action::Update, &Target::user(user.id))?;

    let role = assigned_role(&actor, &user, &request.role)?;
    ensure_email_free(&state, &request.email, Some(user.id)).await?;

    let changes = UserChanges {
        email: Some(request.email),
        role: Some(role),
        first_name: Some(request.first_name),
        last_name: Some(request.last_name),
        city: Some(request.city),
    };
    save_user(&state, user.id, changes).await
}

/// 部分更新用户。
async fn partial_update_user(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
    ValidJson(request): ValidJson<UserPatchRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = visible_user(&state, &actor, UserId::new(id)).await?;
    authorize(&actor, Action::PartialUpdate, &Target::user(user.id))?;

    let role = request
        .role
        .as_deref()
        .map(|raw| assigned_role(&actor, &user, raw))
        .transpose()?;
    if let Some(email) = request.email.as_deref() {
        ensure_email_free(&state, email, Some(user.id)).await?;
    }

    let changes = UserChanges {
        email: request.email,
        role,
        first_name: request.first_name.map(Some),
        last_name: request.last_name.map(Some),
        city: request.city.map(Some),
    };
    save_user(&state, user.id, changes).await
}

/// 已有账户的角色变更：只有管理员可以授予管理员角色，保持原角色总是允许的。
fn assigned_role(actor: &Actor, user: &UserRecord, raw: &str) -> Result<Role, ApiError> {
    let role = Role::from_str(raw)?;
    if role == user.role || role.is_self_assignable() || actor.is_admin() {
        Ok(role)
    } else {
        Err(AccessError::Forbidden.into())
    }
}

/// 写入用户变更。
async fn save_user(
    state: &AppState,
    id: UserId,
    changes: UserChanges,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .update(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;
    Ok(Json(user_response(user)))
}

/// 删除用户。
async fn destroy_user(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    IdPath(id): IdPath<i32>,
) -> Result<StatusCode, ApiError> {
    let user = visible_user(&state, &actor, UserId::new(id)).await?;
    authorize(&actor, Action::Destroy, &Target::user(user.id))?;

    if !state.users.delete(user.id).await? {
        return Err(ApiError::not_found("user"));
    }
    info!(user_id = %user.id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// 用邮箱和密码登录，返回访问令牌与刷新令牌。
async fn login(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let user = state
        .users
        .find_by_email(&request.email)
        .await?
        .filter(|user| verify_password(&request.password, &user.password_hash))
        .ok_or_else(|| ApiError::validation("unable to log in with provided credentials"))?;

    let pair = state.tokens.issue_pair(user.id)?;
    Ok(Json(TokenPairResponse {
        access: pair.access,
        refresh: pair.refresh,
    }))
}

/// 用刷新令牌换取新的访问令牌。
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let access = state.tokens.refresh(&request.refresh)?;
    Ok(Json(AccessTokenResponse { access }))
}
