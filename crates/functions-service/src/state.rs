//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use premiads_shared::config::RewardsConfig;
use premiads_shared::database::Database;

use crate::auth::{IdentityProvider, JwtManager};
use crate::repository::{
    CrmRepository, CrmRepositoryTrait, MissionRepository, MissionRepositoryTrait,
    NotificationRepository, NotificationRepositoryTrait, ProfileRepository,
    ProfileRepositoryTrait, PurchaseRepository, PurchaseRepositoryTrait, RaffleRepository,
    RaffleRepositoryTrait, ReferralRepository, ReferralRepositoryTrait,
};
use crate::service::{
    ApprovalService, CrmService, NotificationService, PurchaseService, RaffleService,
    ReferralService, UserAdminService,
};

/// 服务层依赖的全部仓储
#[derive(Clone)]
pub struct Repositories {
    pub profiles: Arc<dyn ProfileRepositoryTrait>,
    pub missions: Arc<dyn MissionRepositoryTrait>,
    pub crm: Arc<dyn CrmRepositoryTrait>,
    pub notifications: Arc<dyn NotificationRepositoryTrait>,
    pub raffles: Arc<dyn RaffleRepositoryTrait>,
    pub purchases: Arc<dyn PurchaseRepositoryTrait>,
    pub referrals: Arc<dyn ReferralRepositoryTrait>,
}

impl Repositories {
    /// 基于 PostgreSQL 的仓储实现
    pub fn postgres(db: &Database) -> Self {
        let pool = db.pool().clone();
        Self {
            profiles: Arc::new(ProfileRepository::new(pool.clone())),
            missions: Arc::new(MissionRepository::new(pool.clone())),
            crm: Arc::new(CrmRepository::new(pool.clone())),
            notifications: Arc::new(NotificationRepository::new(pool.clone())),
            raffles: Arc::new(RaffleRepository::new(pool.clone())),
            purchases: Arc::new(PurchaseRepository::new(pool.clone())),
            referrals: Arc::new(ReferralRepository::new(pool)),
        }
    }
}

/// Axum 应用共享状态
///
/// 所有字段均为 Arc，克隆开销固定
#[derive(Clone)]
pub struct AppState {
    pub jwt: Arc<JwtManager>,
    pub profiles: Arc<dyn ProfileRepositoryTrait>,
    pub approval: Arc<ApprovalService>,
    pub crm: Arc<CrmService>,
    pub notifications: Arc<NotificationService>,
    pub user_admin: Arc<UserAdminService>,
    pub raffles: Arc<RaffleService>,
    pub purchases: Arc<PurchaseService>,
    pub referrals: Arc<ReferralService>,
    /// 就绪检查使用，未连接数据库时为 None
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(
        jwt: JwtManager,
        repos: Repositories,
        identity: Arc<dyn IdentityProvider>,
        rewards: &RewardsConfig,
        database: Option<Database>,
    ) -> Self {
        let referrals = Arc::new(ReferralService::new(
            repos.referrals.clone(),
            repos.missions.clone(),
            rewards.referral_bonus_rifas,
            rewards.referred_bonus_rifas,
        ));

        Self {
            jwt: Arc::new(jwt),
            profiles: repos.profiles.clone(),
            approval: Arc::new(ApprovalService::new(repos.missions.clone(), referrals.clone())),
            crm: Arc::new(CrmService::new(
                repos.missions.clone(),
                repos.crm.clone(),
                rewards.crm_unlock_cost,
            )),
            notifications: Arc::new(NotificationService::new(
                repos.notifications.clone(),
                repos.profiles.clone(),
            )),
            user_admin: Arc::new(UserAdminService::new(identity, repos.profiles.clone())),
            raffles: Arc::new(RaffleService::new(
                repos.raffles.clone(),
                rewards.max_entries_per_purchase,
            )),
            purchases: Arc::new(PurchaseService::new(repos.purchases.clone())),
            referrals,
            database,
        }
    }
}
