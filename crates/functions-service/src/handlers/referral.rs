//! 推荐处理器

use axum::{extract::State, response::Response};
use validator::Validate;

use super::{success, success_with_message};
use crate::{
    dto::{ReferralAction, ReferralCodeResponse, ReferralResponse},
    error::ApiError,
    extract::{AppJson, CurrentUser},
    state::AppState,
};

/// POST /functions/v1/process-referral
pub async fn process_referral(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    AppJson(action): AppJson<ReferralAction>,
) -> Result<Response, ApiError> {
    let service = &state.referrals;

    let response = match action {
        ReferralAction::Code => {
            let code = service.get_or_create_code(&caller).await?;
            success(ReferralCodeResponse { code })
        }
        ReferralAction::Register(req) => {
            req.validate()?;
            let referral = service.register(&caller, &req.code).await?;
            success_with_message(ReferralResponse { referral }, "referral registered")
        }
        ReferralAction::Complete(req) => {
            let referral = service.complete(&caller, req.referred_id).await?;
            success_with_message(ReferralResponse { referral }, "referral completed")
        }
    };
    Ok(response)
}
