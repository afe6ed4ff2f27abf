//! 健康检查处理器

use axum::{Json, extract::State};
use serde_json::{Value, json};
use tracing::warn;

use crate::state::AppState;

/// 存活检查：服务进程正常即返回 ok
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "premiads-functions"
    }))
}

/// 就绪检查：数据库可连接且已完成迁移
pub async fn readiness_check(State(state): State<AppState>) -> Json<Value> {
    let status = match &state.database {
        Some(db) => match db.health_check().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(error = %e, "database health check failed");
                None
            }
        },
        None => None,
    };
    let ready = status.as_ref().is_some_and(|s| s.is_ready());

    Json(json!({
        "status": if ready { "ok" } else { "degraded" },
        "service": "premiads-functions",
        "checks": {
            "database": if ready { "ok" } else { "fail" },
            "pool": status,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness_reports_service() {
        let Json(body) = health_check().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "premiads-functions");
    }
}
