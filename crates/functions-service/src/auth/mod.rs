//! 认证模块
//!
//! 提供 JWT Token 验证和身份服务管理 API 客户端

mod identity;
mod jwt;

pub use identity::{IdentityAdminClient, IdentityProvider, IdentityUserRequest};
pub use jwt::{Claims, JwtManager};

#[cfg(test)]
pub use identity::MockIdentityProvider;
