//! 站内通知处理器

use axum::{extract::State, response::Response};

use super::{success, success_with_message};
use crate::{
    dto::{AffectedResponse, NotificationAction},
    error::ApiError,
    extract::{AppJson, CurrentUser},
    state::AppState,
};

/// POST /functions/v1/notifications
pub async fn notifications(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    AppJson(action): AppJson<NotificationAction>,
) -> Result<Response, ApiError> {
    let service = &state.notifications;

    let response = match action {
        NotificationAction::Send(req) => {
            let affected = service.send(&caller, req).await?;
            success_with_message(AffectedResponse { affected }, "notifications sent")
        }
        NotificationAction::Broadcast(req) => {
            let affected = service.broadcast(&caller, req).await?;
            success_with_message(AffectedResponse { affected }, "broadcast sent")
        }
        NotificationAction::List(req) => success(service.list(&caller, req).await?),
        NotificationAction::MarkRead(req) => {
            let affected = service.mark_read(&caller, req).await?;
            success(AffectedResponse { affected })
        }
        NotificationAction::MarkAllRead => {
            let affected = service.mark_all_read(&caller).await?;
            success(AffectedResponse { affected })
        }
        NotificationAction::Delete(req) => {
            service.delete(&caller, req.notification_id).await?;
            success_with_message(AffectedResponse { affected: 1 }, "notification deleted")
        }
    };
    Ok(response)
}
