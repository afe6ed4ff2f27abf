//! 函数服务错误类型定义
//!
//! 所有处理器、服务与仓储共用同一错误类型，统一映射为 HTTP 状态码和 JSON 错误体。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

/// 函数服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 认证错误
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("profile not found for user {0}")]
    ProfileMissing(Uuid),

    // 请求错误
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("validation failed: {0}")]
    Validation(String),

    // 资源不存在
    #[error("submission not found: {0}")]
    SubmissionNotFound(Uuid),
    #[error("mission not found: {0}")]
    MissionNotFound(Uuid),
    #[error("raffle not found: {0}")]
    RaffleNotFound(Uuid),
    #[error("credit package not found: {0}")]
    PackageNotFound(Uuid),
    #[error("purchase not found: {0}")]
    PurchaseNotFound(Uuid),
    #[error("notification not found: {0}")]
    NotificationNotFound(Uuid),
    #[error("referral code not found: {0}")]
    ReferralCodeNotFound(String),
    #[error("referral not found for user {0}")]
    ReferralNotFound(Uuid),
    #[error("not found: {0}")]
    NotFound(String),

    // 业务错误
    #[error("already processed: {0}")]
    AlreadyProcessed(String),
    #[error("insufficient rifas: required {required}, available {available}")]
    InsufficientRifas { required: i64, available: i64 },
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("not eligible: {0}")]
    NotEligible(String),

    // 系统错误
    #[error("identity service error: {0}")]
    Identity(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::ProfileMissing(_) => StatusCode::FORBIDDEN,

            Self::BadRequest(_)
            | Self::Validation(_)
            | Self::AlreadyProcessed(_)
            | Self::InsufficientRifas { .. }
            | Self::InvalidTransition { .. }
            | Self::NotEligible(_) => StatusCode::BAD_REQUEST,

            Self::SubmissionNotFound(_)
            | Self::MissionNotFound(_)
            | Self::RaffleNotFound(_)
            | Self::PackageNotFound(_)
            | Self::PurchaseNotFound(_)
            | Self::NotificationNotFound(_)
            | Self::ReferralCodeNotFound(_)
            | Self::ReferralNotFound(_)
            | Self::NotFound(_) => StatusCode::NOT_FOUND,

            Self::Identity(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::ProfileMissing(_) => "PROFILE_MISSING",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::SubmissionNotFound(_) => "SUBMISSION_NOT_FOUND",
            Self::MissionNotFound(_) => "MISSION_NOT_FOUND",
            Self::RaffleNotFound(_) => "RAFFLE_NOT_FOUND",
            Self::PackageNotFound(_) => "PACKAGE_NOT_FOUND",
            Self::PurchaseNotFound(_) => "PURCHASE_NOT_FOUND",
            Self::NotificationNotFound(_) => "NOTIFICATION_NOT_FOUND",
            Self::ReferralCodeNotFound(_) => "REFERRAL_CODE_NOT_FOUND",
            Self::ReferralNotFound(_) => "REFERRAL_NOT_FOUND",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyProcessed(_) => "ALREADY_PROCESSED",
            Self::InsufficientRifas { .. } => "INSUFFICIENT_RIFAS",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotEligible(_) => "NOT_ELIGIBLE",
            Self::Identity(_) => "IDENTITY_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "database operation failed");
                "internal server error".to_string()
            }
            Self::Identity(e) => {
                tracing::error!(error = %e, "identity service call failed");
                "internal server error".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 从 JSON 序列化错误转换
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("json error: {}", err))
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn all_error_variants() -> Vec<(ApiError, StatusCode, &'static str)> {
        let id = Uuid::nil();
        vec![
            (ApiError::Unauthorized("token expired".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (ApiError::Forbidden("admin only".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (ApiError::ProfileMissing(id), StatusCode::FORBIDDEN, "PROFILE_MISSING"),
            (ApiError::BadRequest("unknown variant".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (ApiError::Validation("email".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (ApiError::SubmissionNotFound(id), StatusCode::NOT_FOUND, "SUBMISSION_NOT_FOUND"),
            (ApiError::MissionNotFound(id), StatusCode::NOT_FOUND, "MISSION_NOT_FOUND"),
            (ApiError::RaffleNotFound(id), StatusCode::NOT_FOUND, "RAFFLE_NOT_FOUND"),
            (ApiError::PackageNotFound(id), StatusCode::NOT_FOUND, "PACKAGE_NOT_FOUND"),
            (ApiError::PurchaseNotFound(id), StatusCode::NOT_FOUND, "PURCHASE_NOT_FOUND"),
            (ApiError::NotificationNotFound(id), StatusCode::NOT_FOUND, "NOTIFICATION_NOT_FOUND"),
            (ApiError::ReferralCodeNotFound("ABC".into()), StatusCode::NOT_FOUND, "REFERRAL_CODE_NOT_FOUND"),
            (ApiError::ReferralNotFound(id), StatusCode::NOT_FOUND, "REFERRAL_NOT_FOUND"),
            (ApiError::NotFound("thing".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (ApiError::AlreadyProcessed("submission".into()), StatusCode::BAD_REQUEST, "ALREADY_PROCESSED"),
            (ApiError::InsufficientRifas { required: 10, available: 3 }, StatusCode::BAD_REQUEST, "INSUFFICIENT_RIFAS"),
            (ApiError::invalid_transition("drawn", "active"), StatusCode::BAD_REQUEST, "INVALID_TRANSITION"),
            (ApiError::NotEligible("no approved submission".into()), StatusCode::BAD_REQUEST, "NOT_ELIGIBLE"),
            (ApiError::Identity("timeout".into()), StatusCode::INTERNAL_SERVER_ERROR, "IDENTITY_ERROR"),
            (ApiError::Database(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            (ApiError::Internal("oops".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ]
    }

    #[test]
    fn test_all_variants_status_and_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            assert_eq!(error.status_code(), expected_status, "status mismatch: {expected_code}");
            assert_eq!(error.error_code(), expected_code);
        }
    }

    #[test]
    fn test_display_contains_context() {
        let err = ApiError::InsufficientRifas {
            required: 120,
            available: 30,
        };
        let text = err.to_string();
        assert!(text.contains("120"));
        assert!(text.contains("30"));

        let err = ApiError::invalid_transition("confirmed", "pending");
        assert!(err.to_string().contains("confirmed -> pending"));
    }

    #[tokio::test]
    async fn test_business_error_body() {
        let response = ApiError::Forbidden("role participante cannot unlock crm".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "FORBIDDEN");
        assert!(body["error"].as_str().unwrap().contains("participante"));
    }

    #[tokio::test]
    async fn test_system_error_hides_details() {
        let response = ApiError::Internal("secret connection string".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "internal server error");
        assert!(!bytes.windows(6).any(|w| w == b"secret"));
    }
}
