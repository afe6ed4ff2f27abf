//! PremiAds 函数服务
//!
//! 以 HTTP 端点形式提供平台的服务端业务：任务提交审核、CRM 数据解锁、
//! 站内通知、管理员建号、抽奖、充值与推荐奖励。
//!
//! ## 模块结构
//!
//! - `auth`: JWT 校验与身份服务管理客户端
//! - `dto`: 请求和响应的数据传输对象
//! - `models`: 数据库实体
//! - `repository`: 数据访问层，多表写入在单个事务内完成
//! - `service`: 业务服务，鉴权、校验与派生计算
//! - `handlers` / `routes`: HTTP 处理器与路由
//! - `middleware` / `extract`: 认证中间件与请求提取器
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据库：sqlx (PostgreSQL)
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod auth;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

pub use error::{ApiError, Result};
pub use routes::build_router;
pub use state::{AppState, Repositories};
