//! 抽奖处理器

use axum::{extract::State, response::Response};

use super::{success, success_with_message};
use crate::{
    dto::RaffleAction,
    error::ApiError,
    extract::{AppJson, CurrentUser},
    state::AppState,
};

/// POST /functions/v1/raffles
pub async fn raffles(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    AppJson(action): AppJson<RaffleAction>,
) -> Result<Response, ApiError> {
    let service = &state.raffles;

    let response = match action {
        RaffleAction::Create(req) => {
            success_with_message(service.create(&caller, req).await?, "raffle created")
        }
        RaffleAction::Activate(req) => success(service.activate(&caller, req.raffle_id).await?),
        RaffleAction::Cancel(req) => success(service.cancel(&caller, req.raffle_id).await?),
        RaffleAction::BuyEntries(req) => success(service.buy_entries(&caller, req).await?),
        RaffleAction::Draw(req) => {
            success_with_message(service.draw(&caller, req.raffle_id).await?, "raffle drawn")
        }
        RaffleAction::Entries(req) => success(service.entries(&caller, req.raffle_id).await?),
    };
    Ok(response)
}
