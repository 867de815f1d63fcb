//! HTTP API 路由。

pub mod content;
pub mod error;
pub mod extract;
pub mod state;
pub mod testing;
pub mod users;

use std::sync::Arc;

use anyhow::Context;
use axum::{Json, Router, http::HeaderValue, routing::get};
use selfstudy_api_types::HealthCheckResponse;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub use content::create_content_router;
pub use error::ApiError;
pub use state::AppState;
pub use testing::create_testing_router;
pub use users::create_auth_router;

/// 创建完整的应用路由。
pub fn create_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(create_auth_router())
        .merge(create_content_router())
        .merge(create_testing_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// 按配置的来源构建 CORS 层。`"*"` 允许任意来源，空列表不允许跨域访问。
pub fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    let allow_origin = if allowed_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        let origins = allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("invalid CORS origin: {origin}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

/// 健康检查。
async fn health() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse::ok())
}
