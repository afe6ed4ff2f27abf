//! 路由配置模块
//!
//! 函数端点统一挂载在 /functions/v1 下，全部使用 POST

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use premiads_shared::config::CorsConfig;
use premiads_shared::observability::middleware as obs_middleware;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    handlers,
    middleware::{auth_middleware, security_headers},
    state::AppState,
};

pub const FUNCTIONS_PREFIX: &str = "/functions/v1";

/// 构建函数端点路由
pub fn function_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/approve-submission",
            post(handlers::submission::approve_submission),
        )
        .route("/unlock-crm", post(handlers::crm::unlock_crm))
        .route(
            "/notifications",
            post(handlers::notification::notifications),
        )
        .route(
            "/admin-create-user",
            post(handlers::admin_user::admin_create_user),
        )
        .route("/raffles", post(handlers::raffle::raffles))
        .route(
            "/purchase-credits",
            post(handlers::purchase::purchase_credits),
        )
        .route(
            "/process-referral",
            post(handlers::referral::process_referral),
        )
        .route(
            "/update-purchase-status",
            post(handlers::purchase::update_purchase_status),
        )
}

/// 浏览器客户端需要的 CORS 策略
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    if config.allows_any() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .origins()
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}

/// 组装完整应用
///
/// 中间件由内到外：认证 -> 安全头 -> 请求追踪 -> 请求 ID -> CORS，
/// 预检请求在最外层的 CORS 处理，不进入认证
pub fn build_router(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .nest(FUNCTIONS_PREFIX, function_routes())
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .layer(cors_layer(cors))
        .with_state(state)
}
