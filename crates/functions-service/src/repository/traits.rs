//! 仓储 Trait 定义
//!
//! 服务层依赖这些抽象而非具体实现，测试时通过 mockall 生成的 Mock 替换。
//! 涉及余额或状态变更的方法在实现内部以单个数据库事务完成。

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AuditEntry, CreditPackage, CreditPurchase, CrmParticipant, CrmUnlock, DrawOutcome, DrawSeed,
    Mission, NewNotification, NewProfile, NewPurchase, NewRaffle, Notification, Profile,
    PurchaseStatus, Raffle, RaffleEntry, RaffleStatus, Referral, ReferralCode, Submission,
    UserType,
};

/// 审核通过的事务参数
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalPlan {
    pub submission_id: Uuid,
    pub mission_id: Uuid,
    pub participant_id: Uuid,
    pub reviewer_id: Uuid,
    pub feedback: Option<String>,
    pub rifas: i64,
    pub cashback_cents: i64,
    pub notification: NewNotification,
    pub audit: AuditEntry,
}

/// 审核通过的事务结果
#[derive(Debug, Clone)]
pub struct ApprovalRecord {
    pub submission: Submission,
    pub rifas_balance: i64,
    pub cashback_balance_cents: i64,
    pub mission_closed: bool,
}

/// 审核拒绝的事务参数
#[derive(Debug, Clone, PartialEq)]
pub struct RejectionPlan {
    pub submission_id: Uuid,
    pub reviewer_id: Uuid,
    pub feedback: String,
    pub notification: NewNotification,
    pub audit: AuditEntry,
}

/// CRM 解锁的事务参数
#[derive(Debug, Clone, PartialEq)]
pub struct CrmUnlockPlan {
    pub advertiser_id: Uuid,
    pub mission_id: Uuid,
    pub cost: i64,
    pub audit: AuditEntry,
}

#[derive(Debug, Clone)]
pub struct CrmUnlockOutcome {
    pub unlock: CrmUnlock,
    /// 本次是否实际扣费（已解锁时为 false）
    pub charged: bool,
    pub rifas_balance: i64,
}

/// 购买抽奖券的事务参数
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPurchasePlan {
    pub raffle_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct EntryPurchaseOutcome {
    pub ticket_numbers: Vec<i32>,
    pub total_cost: i64,
    pub rifas_balance: i64,
}

/// 开奖参数，种子由调用方生成
#[derive(Debug, Clone, PartialEq)]
pub struct DrawPlan {
    pub raffle_id: Uuid,
    pub seed: DrawSeed,
    pub drawn_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct DrawResult {
    pub raffle: Raffle,
    pub outcome: DrawOutcome,
}

/// 充值订单状态变更参数
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseStatusPlan {
    pub purchase_id: Uuid,
    pub status: PurchaseStatus,
    pub admin_id: Uuid,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PurchaseStatusOutcome {
    pub purchase: CreditPurchase,
    pub credited: i64,
}

/// 推荐完成的事务参数
#[derive(Debug, Clone, PartialEq)]
pub struct ReferralCompletionPlan {
    pub referred_id: Uuid,
    pub actor_id: Uuid,
    pub referrer_bonus: i64,
    pub referred_bonus: i64,
}

/// 用户档案仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepositoryTrait: Send + Sync {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>>;
    async fn create_profile(&self, profile: &NewProfile, audit: &AuditEntry) -> Result<Profile>;
    async fn list_ids_by_type(&self, user_type: Option<UserType>) -> Result<Vec<Uuid>>;
    /// 返回 ids 中存在档案的子集
    async fn existing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>>;
}

/// 任务与提交仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MissionRepositoryTrait: Send + Sync {
    async fn get_mission(&self, id: Uuid) -> Result<Option<Mission>>;
    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>>;
    async fn approve_submission(&self, plan: &ApprovalPlan) -> Result<ApprovalRecord>;
    async fn reject_submission(&self, plan: &RejectionPlan) -> Result<Submission>;
    async fn count_approved_submissions(&self, user_id: Uuid) -> Result<i64>;
}

/// CRM 仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CrmRepositoryTrait: Send + Sync {
    async fn find_unlock(&self, advertiser_id: Uuid, mission_id: Uuid)
    -> Result<Option<CrmUnlock>>;
    async fn unlock(&self, plan: &CrmUnlockPlan) -> Result<CrmUnlockOutcome>;
    async fn list_approved_participants(&self, mission_id: Uuid) -> Result<Vec<CrmParticipant>>;
}

/// 通知仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepositoryTrait: Send + Sync {
    async fn insert_many(&self, notifications: &[NewNotification]) -> Result<u64>;
    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>>;
    async fn count_unread(&self, user_id: Uuid) -> Result<i64>;
    async fn mark_read(&self, user_id: Uuid, ids: &[Uuid]) -> Result<u64>;
    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64>;
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool>;
}

/// 抽奖仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RaffleRepositoryTrait: Send + Sync {
    async fn create(&self, raffle: &NewRaffle, audit: &AuditEntry) -> Result<Raffle>;
    async fn get(&self, id: Uuid) -> Result<Option<Raffle>>;
    /// 条件更新，状态已被并发修改时返回 None
    async fn transition(
        &self,
        id: Uuid,
        from: RaffleStatus,
        to: RaffleStatus,
        audit: &AuditEntry,
    ) -> Result<Option<Raffle>>;
    async fn buy_entries(&self, plan: &EntryPurchasePlan) -> Result<EntryPurchaseOutcome>;
    async fn list_entries(&self, raffle_id: Uuid, user_id: Option<Uuid>)
    -> Result<Vec<RaffleEntry>>;
    /// 锁定抽奖行后读取全部券并开奖，与购券事务互斥
    async fn draw(&self, plan: &DrawPlan) -> Result<DrawResult>;
}

/// 充值仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseRepositoryTrait: Send + Sync {
    async fn get_package(&self, id: Uuid) -> Result<Option<CreditPackage>>;
    async fn create_purchase(
        &self,
        purchase: &NewPurchase,
        audit: &AuditEntry,
    ) -> Result<CreditPurchase>;
    async fn get_purchase(&self, id: Uuid) -> Result<Option<CreditPurchase>>;
    async fn apply_status(&self, plan: &PurchaseStatusPlan) -> Result<PurchaseStatusOutcome>;
}

/// 推荐仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferralRepositoryTrait: Send + Sync {
    async fn find_code_by_user(&self, user_id: Uuid) -> Result<Option<ReferralCode>>;
    /// 推荐码冲突时返回 None
    async fn insert_code(&self, user_id: Uuid, code: &str) -> Result<Option<ReferralCode>>;
    async fn find_code(&self, code: &str) -> Result<Option<ReferralCode>>;
    async fn find_by_referred(&self, referred_id: Uuid) -> Result<Option<Referral>>;
    async fn create_referral(
        &self,
        referrer_id: Uuid,
        referred_id: Uuid,
        code: &str,
    ) -> Result<Referral>;
    async fn complete(&self, plan: &ReferralCompletionPlan) -> Result<Referral>;
}
