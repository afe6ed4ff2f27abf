//! 数据访问层
//!
//! 每个仓储对应一组表，`traits` 定义服务层依赖的抽象接口。
//! `*_in_tx` 关联函数接受 `&mut PgConnection`，在调用方开启的事务中执行。

mod audit_repo;
mod crm_repo;
mod ledger_repo;
mod mission_repo;
mod notification_repo;
mod profile_repo;
mod purchase_repo;
mod raffle_repo;
mod referral_repo;
pub mod traits;

pub use audit_repo::AuditRepository;
pub use crm_repo::CrmRepository;
pub use ledger_repo::LedgerRepository;
pub use mission_repo::MissionRepository;
pub use notification_repo::NotificationRepository;
pub use profile_repo::ProfileRepository;
pub use purchase_repo::PurchaseRepository;
pub use raffle_repo::RaffleRepository;
pub use referral_repo::ReferralRepository;
pub use traits::{
    ApprovalPlan, ApprovalRecord, CrmRepositoryTrait, CrmUnlockOutcome, CrmUnlockPlan, DrawPlan,
    DrawResult, EntryPurchaseOutcome, EntryPurchasePlan, MissionRepositoryTrait, NotificationRepositoryTrait,
    ProfileRepositoryTrait, PurchaseRepositoryTrait, PurchaseStatusOutcome, PurchaseStatusPlan,
    RaffleRepositoryTrait, ReferralCompletionPlan, ReferralRepositoryTrait, RejectionPlan,
};

#[cfg(test)]
pub use traits::{
    MockCrmRepositoryTrait, MockMissionRepositoryTrait, MockNotificationRepositoryTrait,
    MockProfileRepositoryTrait, MockPurchaseRepositoryTrait, MockRaffleRepositoryTrait,
    MockReferralRepositoryTrait,
};
