//! 充值处理器

use axum::{Json, extract::State};

use crate::{
    dto::{ApiResponse, PurchaseCreditsRequest, PurchaseStatusResponse, UpdatePurchaseStatusRequest},
    error::ApiError,
    extract::{AppJson, CurrentUser},
    models::CreditPurchase,
    state::AppState,
};

/// 创建待支付充值订单
///
/// POST /functions/v1/purchase-credits
pub async fn purchase_credits(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    AppJson(req): AppJson<PurchaseCreditsRequest>,
) -> Result<Json<ApiResponse<CreditPurchase>>, ApiError> {
    let purchase = state.purchases.purchase(&caller, req).await?;
    Ok(Json(ApiResponse::success_with_message(
        purchase,
        "purchase created, awaiting payment",
    )))
}

/// POST /functions/v1/update-purchase-status
pub async fn update_purchase_status(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    AppJson(req): AppJson<UpdatePurchaseStatusRequest>,
) -> Result<Json<ApiResponse<PurchaseStatusResponse>>, ApiError> {
    let response = state.purchases.update_status(&caller, req).await?;
    Ok(Json(ApiResponse::success(response)))
}
