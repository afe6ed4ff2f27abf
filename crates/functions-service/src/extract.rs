//! 请求提取器

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request, rejection::JsonRejection},
    http::request::Parts,
};

use crate::auth::Claims;
use crate::error::ApiError;
use crate::models::Profile;
use crate::state::AppState;

/// 当前调用者档案
///
/// 依赖认证中间件注入的 Claims，再按 `sub` 加载档案；
/// Token 有效但档案不存在时返回 403
pub struct CurrentUser(pub Profile);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .extensions
            .get::<Claims>()
            .ok_or_else(|| ApiError::Unauthorized("missing authentication".to_string()))?
            .user_id()?;

        let profile = state
            .profiles
            .get_profile(user_id)
            .await?
            .ok_or(ApiError::ProfileMissing(user_id))?;

        Ok(Self(profile))
    }
}

/// JSON 请求体，解析失败统一返回 400
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}
