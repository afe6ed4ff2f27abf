//! 通知仓储

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::NotificationRepositoryTrait;
use crate::error::{ApiError, Result};
use crate::models::{NewNotification, Notification};

pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中写入单条通知
    pub async fn insert_in_tx(conn: &mut PgConnection, notification: &NewNotification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, title, message, kind, metadata)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind)
        .bind(&notification.metadata)
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl NotificationRepositoryTrait for NotificationRepository {
    /// 批量写入，使用 UNNEST 一次插入所有收件人
    async fn insert_many(&self, notifications: &[NewNotification]) -> Result<u64> {
        if notifications.is_empty() {
            return Ok(0);
        }

        let user_ids: Vec<Uuid> = notifications.iter().map(|n| n.user_id).collect();
        let titles: Vec<String> = notifications.iter().map(|n| n.title.clone()).collect();
        let messages: Vec<String> = notifications.iter().map(|n| n.message.clone()).collect();
        let kinds: Vec<String> = notifications
            .iter()
            .map(|n| n.kind.as_str().to_string())
            .collect();
        let metadata: Vec<serde_json::Value> =
            notifications.iter().map(|n| n.metadata.clone()).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, title, message, kind, metadata)
            SELECT * FROM UNNEST($1::uuid[], $2::varchar[], $3::text[], $4::varchar[], $5::jsonb[])
            "#,
        )
        .bind(&user_ids)
        .bind(&titles)
        .bind(&messages)
        .bind(&kinds)
        .bind(&metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            // 收件人档案在校验后被删除
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                ApiError::BadRequest("notification recipient has no profile".to_string())
            }
            other => ApiError::Database(other),
        })?;

        Ok(result.rows_affected())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, title, message, kind, read, metadata, created_at
            FROM notifications
            WHERE user_id = $1 AND ($2 = FALSE OR read = FALSE)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn count_unread(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn mark_read(&self, user_id: Uuid, ids: &[Uuid]) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND id = ANY($2) AND read = FALSE",
        )
        .bind(user_id)
        .bind(ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE")
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
