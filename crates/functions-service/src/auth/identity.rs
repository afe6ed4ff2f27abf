//! 身份服务管理 API 客户端
//!
//! 仅用于管理员创建用户以及创建失败时的补偿删除

use std::time::Duration;

use async_trait::async_trait;
use premiads_shared::config::IdentityConfig;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::UserType;

/// 新建身份用户参数
#[derive(Debug, Clone)]
pub struct IdentityUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub user_type: UserType,
}

/// 身份服务接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 创建已确认邮箱的用户，返回用户 ID
    async fn create_user(&self, request: &IdentityUserRequest) -> Result<Uuid>;
    async fn delete_user(&self, user_id: Uuid) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct AdminUserResponse {
    id: Uuid,
}

/// 身份服务错误响应，不同版本字段名不一致
#[derive(Debug, Default, Deserialize)]
struct AdminErrorResponse {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl AdminErrorResponse {
    fn into_message(self) -> Option<String> {
        self.msg.or(self.message).or(self.error_description)
    }
}

/// 仅 400/409/422（如邮箱已注册）归因于请求内容，
/// 认证失败、路径错误、限流与 5xx 均视为服务故障
fn classify_error(status: reqwest::StatusCode, detail: Option<String>) -> ApiError {
    use reqwest::StatusCode;

    match (status, detail) {
        (
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY,
            detail,
        ) => ApiError::BadRequest(detail.unwrap_or_else(|| format!("HTTP {}", status))),
        (_, Some(detail)) => ApiError::Identity(format!("HTTP {}: {}", status.as_u16(), detail)),
        (_, None) => ApiError::Identity(format!("HTTP {}", status)),
    }
}

/// 基于 HTTP 的身份服务管理客户端
pub struct IdentityAdminClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl IdentityAdminClient {
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ApiError::Internal(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_role_key.clone(),
        })
    }

    fn users_url(&self) -> String {
        format!("{}/admin/users", self.base_url)
    }

    async fn error_from_response(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let detail = response
            .json::<AdminErrorResponse>()
            .await
            .unwrap_or_default()
            .into_message();

        classify_error(status, detail)
    }
}

#[async_trait]
impl IdentityProvider for IdentityAdminClient {
    async fn create_user(&self, request: &IdentityUserRequest) -> Result<Uuid> {
        let response = self
            .client
            .post(self.users_url())
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&json!({
                "email": request.email,
                "password": request.password,
                "email_confirm": true,
                "user_metadata": {
                    "full_name": request.full_name,
                    "user_type": request.user_type,
                },
            }))
            .send()
            .await
            .map_err(|e| ApiError::Identity(format!("create user request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let user = response
            .json::<AdminUserResponse>()
            .await
            .map_err(|e| ApiError::Identity(format!("invalid create user response: {e}")))?;

        Ok(user.id)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/{}", self.users_url(), user_id))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await
            .map_err(|e| ApiError::Identity(format!("delete user request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        Ok(())
    }
}
