//! 响应 DTO 定义

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    CreditPurchase, CrmParticipant, Notification, Raffle, RaffleEntry, Referral, Submission,
};

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::success_with_message(data, "ok")
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

/// 批量操作影响行数
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedResponse {
    pub affected: u64,
}

// ==================== approve-submission ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReviewResponse {
    pub submission: Submission,
    pub rifas_credited: i64,
    pub cashback_cents: i64,
    /// 仅审核通过时返回
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rifas_balance: Option<i64>,
    pub mission_closed: bool,
    /// 推荐奖励是否在本次审核后发放
    pub referral_completed: bool,
}

// ==================== unlock-crm ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmStatusResponse {
    pub mission_id: Uuid,
    pub unlocked: bool,
    pub cost: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// 人口统计聚合
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    pub by_gender: BTreeMap<String, u64>,
    pub by_age_range: BTreeMap<String, u64>,
    pub by_state: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmParticipantDto {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i32>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl CrmParticipantDto {
    pub fn from_participant(participant: CrmParticipant, age: Option<i32>) -> Self {
        Self {
            user_id: participant.user_id,
            full_name: participant.full_name,
            email: participant.email,
            city: participant.city,
            state: participant.state,
            gender: participant.gender,
            age,
            approved_at: participant.approved_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmDataResponse {
    pub mission_id: Uuid,
    pub total_participants: usize,
    pub participants: Vec<CrmParticipantDto>,
    pub demographics: Demographics,
    /// 本次请求是否产生扣费
    pub charged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rifas_balance: Option<i64>,
}

// ==================== notifications ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub items: Vec<Notification>,
    pub unread_count: i64,
}

// ==================== admin-create-user ====================
// 直接返回 Profile

// ==================== raffles ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyEntriesResponse {
    pub raffle_id: Uuid,
    pub ticket_numbers: Vec<i32>,
    pub total_cost: i64,
    pub rifas_balance: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResponse {
    pub raffle: Raffle,
    pub winner_id: Uuid,
    pub winning_number: i32,
    pub total_entries: usize,
    /// 十六进制开奖种子，配合 seedHash 复核开奖结果
    pub seed: String,
    pub seed_hash: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleEntriesResponse {
    pub raffle_id: Uuid,
    pub total: usize,
    pub entries: Vec<RaffleEntry>,
}

// ==================== purchases ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseStatusResponse {
    pub purchase: CreditPurchase,
    pub credited: i64,
}

// ==================== process-referral ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralCodeResponse {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralResponse {
    pub referral: Referral,
}
