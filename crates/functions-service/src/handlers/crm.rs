//! CRM 数据解锁处理器

use axum::{extract::State, response::Response};

use super::{success, success_with_message};
use crate::{
    dto::{CrmAction, UnlockCrmRequest},
    error::ApiError,
    extract::{AppJson, CurrentUser},
    state::AppState,
};

/// POST /functions/v1/unlock-crm
pub async fn unlock_crm(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    AppJson(req): AppJson<UnlockCrmRequest>,
) -> Result<Response, ApiError> {
    let response = match req.action {
        CrmAction::Status => success(state.crm.status(&caller, req.mission_id).await?),
        CrmAction::Unlock => {
            let data = state.crm.unlock(&caller, req.mission_id).await?;
            let message = if data.charged {
                "crm data unlocked"
            } else {
                "crm data already unlocked"
            };
            success_with_message(data, message)
        }
        CrmAction::Data => success(state.crm.data(&caller, req.mission_id).await?),
    };
    Ok(response)
}
