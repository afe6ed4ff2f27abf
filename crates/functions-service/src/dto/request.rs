//! 请求 DTO 定义
//!
//! 多动作端点使用 `action` 字段区分，未知动作在反序列化阶段即被拒绝

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::{NotificationKind, PaymentMethod, PurchaseStatus, UserType};

// ==================== approve-submission ====================

/// 审核任务提交请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApproveSubmissionRequest {
    pub submission_id: Uuid,
    pub approved: bool,
    #[validate(length(max = 1000, message = "feedback must be at most 1000 characters"))]
    pub feedback: Option<String>,
}

// ==================== unlock-crm ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrmAction {
    Unlock,
    Status,
    Data,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockCrmRequest {
    pub action: CrmAction,
    pub mission_id: Uuid,
}

// ==================== notifications ====================

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NotificationAction {
    Send(SendNotificationRequest),
    Broadcast(BroadcastNotificationRequest),
    List(ListNotificationsRequest),
    MarkRead(MarkReadRequest),
    MarkAllRead,
    Delete(DeleteNotificationRequest),
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    #[validate(length(min = 1, max = 1000, message = "userIds must contain 1 to 1000 recipients"))]
    pub user_ids: Vec<Uuid>,
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "message must be 1-2000 characters"))]
    pub message: String,
    #[serde(default)]
    pub kind: Option<NotificationKind>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastNotificationRequest {
    #[serde(default)]
    pub user_type: Option<UserType>,
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "message must be 1-2000 characters"))]
    pub message: String,
    #[serde(default)]
    pub kind: Option<NotificationKind>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListNotificationsRequest {
    pub unread_only: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    #[validate(length(min = 1, max = 1000, message = "notificationIds must contain 1 to 1000 ids"))]
    pub notification_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNotificationRequest {
    pub notification_id: Uuid,
}

// ==================== admin-create-user ====================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminCreateUserRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 72, message = "password must be 8-72 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 120, message = "fullName must be 1-120 characters"))]
    pub full_name: String,
    pub user_type: UserType,
    #[validate(range(min = 0, message = "initialRifas must not be negative"))]
    #[serde(default)]
    pub initial_rifas: Option<i64>,
}

// ==================== raffles ====================

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RaffleAction {
    Create(CreateRaffleRequest),
    Activate(RaffleIdRequest),
    Cancel(RaffleIdRequest),
    BuyEntries(BuyEntriesRequest),
    Draw(RaffleIdRequest),
    Entries(RaffleIdRequest),
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRaffleRequest {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200, message = "prize must be 1-200 characters"))]
    pub prize: String,
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "entryCost must be between 1 and 1000000"
    ))]
    pub entry_cost: i64,
    #[validate(range(min = 1, message = "maxEntries must be at least 1"))]
    #[serde(default)]
    pub max_entries: Option<i32>,
    #[serde(default)]
    pub draw_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleIdRequest {
    pub raffle_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BuyEntriesRequest {
    pub raffle_id: Uuid,
    #[validate(range(min = 1, max = 100, message = "quantity must be between 1 and 100"))]
    pub quantity: i32,
}

// ==================== purchase-credits ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseCreditsRequest {
    pub package_id: Uuid,
    pub payment_method: PaymentMethod,
}

// ==================== process-referral ====================

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReferralAction {
    Code,
    Register(RegisterReferralRequest),
    Complete(CompleteReferralRequest),
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReferralRequest {
    #[validate(length(min = 4, max = 16, message = "invalid referral code"))]
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteReferralRequest {
    pub referred_id: Uuid,
}

// ==================== update-purchase-status ====================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePurchaseStatusRequest {
    pub purchase_id: Uuid,
    pub status: PurchaseStatus,
    #[validate(length(max = 500, message = "note must be at most 500 characters"))]
    #[serde(default)]
    pub note: Option<String>,
}
