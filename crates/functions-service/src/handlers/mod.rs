//! HTTP 请求处理器模块
//!
//! 每个函数端点一个处理器，负责解析请求并调用对应服务

pub mod admin_user;
pub mod crm;
pub mod health;
pub mod notification;
pub mod purchase;
pub mod raffle;
pub mod referral;
pub mod submission;

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::dto::ApiResponse;

/// 按 action 分发的端点返回类型各不相同，统一包装为成功响应
pub(crate) fn success<T: Serialize>(data: T) -> Response {
    Json(ApiResponse::success(data)).into_response()
}

pub(crate) fn success_with_message<T: Serialize>(data: T, message: &str) -> Response {
    Json(ApiResponse::success_with_message(data, message)).into_response()
}
