//! 提交审核处理器

use axum::{Json, extract::State};

use crate::{
    dto::{ApiResponse, ApproveSubmissionRequest, SubmissionReviewResponse},
    error::ApiError,
    extract::{AppJson, CurrentUser},
    state::AppState,
};

/// 审核任务提交
///
/// POST /functions/v1/approve-submission
pub async fn approve_submission(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    AppJson(req): AppJson<ApproveSubmissionRequest>,
) -> Result<Json<ApiResponse<SubmissionReviewResponse>>, ApiError> {
    let approved = req.approved;
    let response = state.approval.review(&caller, req).await?;

    let message = if approved {
        "submission approved"
    } else {
        "submission rejected"
    };
    Ok(Json(ApiResponse::success_with_message(response, message)))
}
