//! JWT 认证中间件
//!
//! 验证请求中的 Bearer Token 并将 Claims 注入请求扩展

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;

use crate::state::AppState;

/// 健康检查路由不需要认证
const PUBLIC_PATHS: [&str; 2] = ["/health", "/ready"];

/// 认证中间件
///
/// 预检请求与公开路由直接放行，其余请求必须携带有效的 Bearer Token
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let token = match bearer_token(&request) {
        Some(token) => token,
        None => return unauthorized_response("missing bearer token"),
    };

    match state.jwt.verify_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "token rejected");
            unauthorized_response("invalid or expired token")
        }
    }
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn unauthorized_response(message: &str) -> Response {
    let body = json!({
        "success": false,
        "code": "UNAUTHORIZED",
        "error": message,
    });

    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}
