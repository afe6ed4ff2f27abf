//! 数据库连接管理模块
//!
//! PostgreSQL 连接池、启动迁移，以及就绪检查所需的连接与表结构检查。

use crate::config::DatabaseConfig;
use crate::error::Result;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// 就绪前必须存在的核心表
const REQUIRED_TABLES: [&str; 4] = ["profiles", "rifa_transactions", "raffles", "notifications"];

/// 就绪检查结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    pub pool_size: u32,
    pub idle_connections: usize,
    /// 尚未迁移的核心表
    pub missing_tables: Vec<String>,
}

impl DatabaseStatus {
    pub fn is_ready(&self) -> bool {
        self.missing_tables.is_empty()
    }
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    #[instrument(skip(config), fields(max = config.max_connections, min = config.min_connections))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!("Database connection pool created");
        Ok(Self { pool })
    }

    /// 以现有连接池构造（集成测试用）
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 连接可用且核心表均已迁移时视为就绪
    pub async fn health_check(&self) -> Result<DatabaseStatus> {
        let present: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name::text = ANY($1)",
        )
        .bind(&REQUIRED_TABLES[..])
        .fetch_all(&self.pool)
        .await?;

        let missing_tables: Vec<String> = REQUIRED_TABLES
            .iter()
            .filter(|table| !present.iter().any(|p| p == *table))
            .map(|table| table.to_string())
            .collect();
        if !missing_tables.is_empty() {
            warn!(?missing_tables, "database schema is not migrated");
        }

        Ok(DatabaseStatus {
            pool_size: self.pool.size(),
            idle_connections: self.pool.num_idle(),
            missing_tables,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }

    /// 执行仓库根目录 migrations/ 下的迁移
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }
}
