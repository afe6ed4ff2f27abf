//! 领域模型
//!
//! 与数据库表一一对应的实体定义，以及写入时使用的参数结构

pub mod audit;
pub mod crm;
pub mod enums;
pub mod mission;
pub mod notification;
pub mod profile;
pub mod purchase;
pub mod raffle;
pub mod referral;

pub use audit::AuditEntry;
pub use crm::{CrmParticipant, CrmUnlock};
pub use enums::{
    LedgerKind, MissionStatus, NotificationKind, PaymentMethod, PurchaseStatus, RaffleStatus,
    ReferralStatus, SubmissionStatus, UserType,
};
pub use mission::{Mission, MissionReward, Submission};
pub use notification::{NewNotification, Notification};
pub use profile::{NewProfile, Profile, age_on};
pub use purchase::{CreditPackage, CreditPurchase, NewPurchase};
pub use raffle::{
    DrawOutcome, DrawSeed, NewRaffle, Raffle, RaffleEntry, commitment_hash, pick_winner,
};
pub use referral::{Referral, ReferralCode};
