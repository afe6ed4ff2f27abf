//! 领域枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化，数据库中以 varchar 存储

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 用户角色
///
/// 数据库存储葡语规范值，入参额外接受英文别名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum UserType {
    /// 参与者 - 完成任务获取奖励
    #[serde(rename = "participante", alias = "participant")]
    #[sqlx(rename = "participante")]
    Participante,
    /// 广告主 - 创建任务、购买积分、解锁 CRM 数据
    #[serde(rename = "anunciante", alias = "advertiser")]
    #[sqlx(rename = "anunciante")]
    Anunciante,
    /// 平台管理员
    #[serde(rename = "admin", alias = "administrador")]
    #[sqlx(rename = "admin")]
    Admin,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participante => "participante",
            Self::Anunciante => "anunciante",
            Self::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// 广告主与管理员可以管理任务相关数据
    pub fn is_advertiser_or_admin(&self) -> bool {
        matches!(self, Self::Anunciante | Self::Admin)
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "participante" | "participant" => Ok(Self::Participante),
            "anunciante" | "advertiser" => Ok(Self::Anunciante),
            "admin" | "administrador" => Ok(Self::Admin),
            other => Err(format!("unknown user type: {}", other)),
        }
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum MissionStatus {
    /// 待审核
    #[default]
    Pendente,
    /// 进行中
    Ativa,
    /// 已结束（手动关闭或达到参与上限）
    Encerrada,
}

/// 任务提交状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// rifa 账本流水类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum LedgerKind {
    /// 任务奖励（+）
    MissionReward,
    /// 充值到账（+）
    CreditPurchase,
    /// 购买抽奖券（-）
    RaffleEntry,
    /// 解锁 CRM 数据（-）
    CrmUnlock,
    /// 推荐奖励（+）
    ReferralBonus,
    /// 管理员创建用户时发放的初始余额（+）
    InitialGrant,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissionReward => "mission_reward",
            Self::CreditPurchase => "credit_purchase",
            Self::RaffleEntry => "raffle_entry",
            Self::CrmUnlock => "crm_unlock",
            Self::ReferralBonus => "referral_bonus",
            Self::InitialGrant => "initial_grant",
        }
    }

    /// 返回该流水类型的金额符号
    pub fn sign(&self) -> i64 {
        match self {
            Self::MissionReward
            | Self::CreditPurchase
            | Self::ReferralBonus
            | Self::InitialGrant => 1,
            Self::RaffleEntry | Self::CrmUnlock => -1,
        }
    }
}

/// 抽奖状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum RaffleStatus {
    #[default]
    Draft,
    Active,
    Drawn,
    Cancelled,
}

impl RaffleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Drawn => "drawn",
            Self::Cancelled => "cancelled",
        }
    }

    /// draft -> active -> drawn，未开奖前可以取消
    pub fn can_transition_to(&self, next: RaffleStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Active)
                | (Self::Active, Self::Drawn)
                | (Self::Draft, Self::Cancelled)
                | (Self::Active, Self::Cancelled)
        )
    }
}

impl fmt::Display for RaffleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 充值订单状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum PurchaseStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Failed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// 只有 pending 可以流转，且只能流转到终态
    pub fn can_transition_to(&self, next: PurchaseStatus) -> bool {
        matches!(self, Self::Pending) && !matches!(next, Self::Pending)
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 支付方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    CreditCard,
    Boleto,
}

/// 推荐状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ReferralStatus {
    #[default]
    Pending,
    Completed,
}

/// 通知类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    System,
    MissionApproved,
    MissionRejected,
    RaffleWin,
    PurchaseUpdate,
    Referral,
    Promotion,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::MissionApproved => "mission_approved",
            Self::MissionRejected => "mission_rejected",
            Self::RaffleWin => "raffle_win",
            Self::PurchaseUpdate => "purchase_update",
            Self::Referral => "referral",
            Self::Promotion => "promotion",
        }
    }
}
