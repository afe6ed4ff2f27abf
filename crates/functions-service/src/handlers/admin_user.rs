//! 管理员创建用户处理器

use axum::{Json, extract::State};

use crate::{
    dto::{AdminCreateUserRequest, ApiResponse},
    error::ApiError,
    extract::{AppJson, CurrentUser},
    models::Profile,
    state::AppState,
};

/// POST /functions/v1/admin-create-user
pub async fn admin_create_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    AppJson(req): AppJson<AdminCreateUserRequest>,
) -> Result<Json<ApiResponse<Profile>>, ApiError> {
    let profile = state.user_admin.create_user(&caller, req).await?;
    Ok(Json(ApiResponse::success_with_message(profile, "user created")))
}
