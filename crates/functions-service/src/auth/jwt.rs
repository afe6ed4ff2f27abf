//! JWT Token 处理
//!
//! 身份服务签发 HS256 Token，本服务使用共享密钥在本地验证。
//! 签发功能仅用于测试和开发工具。

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use premiads_shared::config::AuthConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 用户 ID（与 profiles.id 一致）
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    /// 身份服务角色，通常为 "authenticated"
    #[serde(default)]
    pub role: Option<String>,
    pub aud: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, ApiError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| ApiError::Unauthorized("token subject is not a valid user id".to_string()))
    }
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    audience: String,
    issuer: Option<String>,
    ttl_secs: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            audience: config.audience.clone(),
            issuer: config.issuer.clone(),
            ttl_secs: config.token_ttl_secs,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        }
    }

    /// 签发 Token，返回 (token, 过期时间戳)
    pub fn issue_token(&self, user_id: Uuid, email: Option<&str>) -> Result<(String, i64), ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.ttl_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            role: Some("authenticated".to_string()),
            aud: self.audience.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {}", e)))?;

        Ok((token, exp.timestamp()))
    }

    /// 验证并解析 Token
    ///
    /// 校验签名、过期时间和受众，配置了签发者时一并校验
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.audience]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    ApiError::Unauthorized("invalid token audience".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    ApiError::Unauthorized("invalid token".to_string())
                }
                _ => ApiError::Unauthorized(format!("token verification failed: {}", e)),
            },
        )?;

        Ok(token_data.claims)
    }
}
