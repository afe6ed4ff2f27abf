//! 通知服务

use std::collections::HashSet;
use std::sync::Arc;

use premiads_shared::observability::metrics;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::require_admin;
use crate::dto::{
    BroadcastNotificationRequest, ListNotificationsRequest, MarkReadRequest,
    NotificationListResponse, SendNotificationRequest,
};
use crate::error::{ApiError, Result};
use crate::models::{NewNotification, NotificationKind, Profile};
use crate::repository::{NotificationRepositoryTrait, ProfileRepositoryTrait};

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 100;

/// 广播时每批写入的通知数
const BROADCAST_BATCH: usize = 1000;

pub struct NotificationService {
    notifications: Arc<dyn NotificationRepositoryTrait>,
    profiles: Arc<dyn ProfileRepositoryTrait>,
}

impl NotificationService {
    pub fn new(
        notifications: Arc<dyn NotificationRepositoryTrait>,
        profiles: Arc<dyn ProfileRepositoryTrait>,
    ) -> Self {
        Self {
            notifications,
            profiles,
        }
    }

    /// 向指定用户发送通知，重复的收件人只发送一次，任一收件人不存在时整批拒绝
    #[instrument(skip(self, caller, request), fields(caller_id = %caller.id))]
    pub async fn send(&self, caller: &Profile, request: SendNotificationRequest) -> Result<u64> {
        require_admin(caller)?;
        request.validate()?;

        let kind = request.kind.unwrap_or_default();
        let metadata = request.metadata.unwrap_or_else(|| serde_json::json!({}));

        let mut seen = HashSet::new();
        let recipients: Vec<Uuid> = request
            .user_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();

        let existing: HashSet<Uuid> = self
            .profiles
            .existing_ids(&recipients)
            .await?
            .into_iter()
            .collect();
        let unknown: Vec<String> = recipients
            .iter()
            .filter(|id| !existing.contains(id))
            .map(Uuid::to_string)
            .collect();
        if !unknown.is_empty() {
            return Err(ApiError::BadRequest(format!(
                "unknown recipients: {}",
                unknown.join(", ")
            )));
        }

        let batch: Vec<NewNotification> = recipients
            .into_iter()
            .map(|user_id| {
                NewNotification::new(user_id, kind, request.title.clone(), request.message.clone())
                    .with_metadata(metadata.clone())
            })
            .collect();

        let sent = self.notifications.insert_many(&batch).await?;
        metrics::record_notifications_sent(kind.as_str(), sent);
        info!(sent, kind = kind.as_str(), "notifications sent");

        Ok(sent)
    }

    /// 向全部用户（或某一角色）广播
    #[instrument(skip(self, caller, request), fields(caller_id = %caller.id))]
    pub async fn broadcast(
        &self,
        caller: &Profile,
        request: BroadcastNotificationRequest,
    ) -> Result<u64> {
        require_admin(caller)?;
        request.validate()?;

        let kind = request.kind.unwrap_or(NotificationKind::Promotion);
        let recipients = self.profiles.list_ids_by_type(request.user_type).await?;

        let mut sent = 0;
        for chunk in recipients.chunks(BROADCAST_BATCH) {
            let batch: Vec<NewNotification> = chunk
                .iter()
                .map(|&user_id| {
                    NewNotification::new(user_id, kind, request.title.clone(), request.message.clone())
                })
                .collect();
            sent += self.notifications.insert_many(&batch).await?;
        }

        metrics::record_notifications_sent(kind.as_str(), sent);
        info!(
            sent,
            user_type = ?request.user_type,
            "notification broadcast finished"
        );

        Ok(sent)
    }

    pub async fn list(
        &self,
        caller: &Profile,
        request: ListNotificationsRequest,
    ) -> Result<NotificationListResponse> {
        let limit = request
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);

        let items = self
            .notifications
            .list_for_user(caller.id, request.unread_only, limit)
            .await?;
        let unread_count = self.notifications.count_unread(caller.id).await?;

        Ok(NotificationListResponse {
            items,
            unread_count,
        })
    }

    pub async fn mark_read(&self, caller: &Profile, request: MarkReadRequest) -> Result<u64> {
        request.validate()?;
        self.notifications
            .mark_read(caller.id, &request.notification_ids)
            .await
    }

    pub async fn mark_all_read(&self, caller: &Profile) -> Result<u64> {
        self.notifications.mark_all_read(caller.id).await
    }

    /// 只能删除自己的通知，他人的通知视为不存在
    pub async fn delete(&self, caller: &Profile, notification_id: Uuid) -> Result<()> {
        if self.notifications.delete(caller.id, notification_id).await? {
            Ok(())
        } else {
            Err(ApiError::NotificationNotFound(notification_id))
        }
    }
}
