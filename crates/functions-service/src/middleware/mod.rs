//! 中间件模块
//!
//! 提供认证与 HTTP 安全头中间件

mod auth;
mod security;

pub use auth::auth_middleware;
pub use security::security_headers;
