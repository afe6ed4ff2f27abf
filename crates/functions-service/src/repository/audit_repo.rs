//! 审计日志写入

use sqlx::PgConnection;

use crate::error::Result;
use crate::models::AuditEntry;

pub struct AuditRepository;

impl AuditRepository {
    /// 在事务中写入审计记录
    pub async fn record_in_tx(conn: &mut PgConnection, entry: &AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (actor_id, action, target_type, target_id, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.actor_id)
        .bind(entry.action)
        .bind(entry.target_type)
        .bind(entry.target_id)
        .bind(&entry.details)
        .execute(conn)
        .await?;

        Ok(())
    }
}
