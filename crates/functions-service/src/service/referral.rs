//! 推荐服务
//!
//! 推荐码生成、推荐关系登记，以及被推荐人首次任务通过后的奖励发放

use std::sync::Arc;

use premiads_shared::observability::metrics;
use rand::Rng;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{random_code, require_admin};
use crate::error::{ApiError, Result};
use crate::models::{Profile, Referral};
use crate::repository::{
    MissionRepositoryTrait, ReferralCompletionPlan, ReferralRepositoryTrait,
};

pub const REFERRAL_CODE_LEN: usize = 8;

/// 推荐码冲突时的最大重试次数
const CODE_ATTEMPTS: usize = 5;

pub fn generate_referral_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    random_code(rng, REFERRAL_CODE_LEN)
}

pub struct ReferralService {
    referrals: Arc<dyn ReferralRepositoryTrait>,
    missions: Arc<dyn MissionRepositoryTrait>,
    referrer_bonus: i64,
    referred_bonus: i64,
}

impl ReferralService {
    pub fn new(
        referrals: Arc<dyn ReferralRepositoryTrait>,
        missions: Arc<dyn MissionRepositoryTrait>,
        referrer_bonus: i64,
        referred_bonus: i64,
    ) -> Self {
        Self {
            referrals,
            missions,
            referrer_bonus,
            referred_bonus,
        }
    }

    /// 返回调用者的推荐码，首次调用时生成
    #[instrument(skip(self, caller), fields(user_id = %caller.id))]
    pub async fn get_or_create_code(&self, caller: &Profile) -> Result<String> {
        if let Some(existing) = self.referrals.find_code_by_user(caller.id).await? {
            return Ok(existing.code);
        }

        for _ in 0..CODE_ATTEMPTS {
            let candidate = generate_referral_code(&mut rand::rng());
            if let Some(created) = self.referrals.insert_code(caller.id, &candidate).await? {
                info!(code = %created.code, "referral code created");
                return Ok(created.code);
            }

            // 并发请求可能已为该用户生成推荐码
            if let Some(existing) = self.referrals.find_code_by_user(caller.id).await? {
                return Ok(existing.code);
            }
        }

        Err(ApiError::Internal(
            "could not allocate a unique referral code".to_string(),
        ))
    }

    /// 登记推荐关系，调用者为被推荐人
    #[instrument(skip(self, caller), fields(user_id = %caller.id))]
    pub async fn register(&self, caller: &Profile, code: &str) -> Result<Referral> {
        let code = code.trim().to_uppercase();

        let owner = self
            .referrals
            .find_code(&code)
            .await?
            .ok_or_else(|| ApiError::ReferralCodeNotFound(code.clone()))?;

        if owner.user_id == caller.id {
            return Err(ApiError::BadRequest(
                "you cannot use your own referral code".to_string(),
            ));
        }

        if self.referrals.find_by_referred(caller.id).await?.is_some() {
            return Err(ApiError::AlreadyProcessed(
                "you have already been referred".to_string(),
            ));
        }

        let referral = self
            .referrals
            .create_referral(owner.user_id, caller.id, &code)
            .await?;

        info!(referrer_id = %owner.user_id, "referral registered");
        Ok(referral)
    }

    /// 管理员手动完成推荐
    pub async fn complete(&self, caller: &Profile, referred_id: Uuid) -> Result<Referral> {
        require_admin(caller)?;
        self.complete_for(caller.id, referred_id).await
    }

    /// 审核通过后尝试完成被审核人的推荐，不存在待完成推荐时返回 false
    pub async fn complete_after_approval(&self, reviewer_id: Uuid, referred_id: Uuid) -> Result<bool> {
        match self.referrals.find_by_referred(referred_id).await? {
            Some(referral) if referral.is_pending() => {
                self.complete_for(reviewer_id, referred_id).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    #[instrument(skip(self))]
    async fn complete_for(&self, actor_id: Uuid, referred_id: Uuid) -> Result<Referral> {
        let referral = self
            .referrals
            .find_by_referred(referred_id)
            .await?
            .ok_or(ApiError::ReferralNotFound(referred_id))?;

        if !referral.is_pending() {
            return Err(ApiError::AlreadyProcessed(format!(
                "referral {} is already completed",
                referral.id
            )));
        }

        let approved = self.missions.count_approved_submissions(referred_id).await?;
        if approved == 0 {
            warn!(%referred_id, "referral completion requested before any approved submission");
            return Err(ApiError::NotEligible(
                "referred user has no approved submission yet".to_string(),
            ));
        }

        let completed = self
            .referrals
            .complete(&ReferralCompletionPlan {
                referred_id,
                actor_id,
                referrer_bonus: self.referrer_bonus,
                referred_bonus: self.referred_bonus,
            })
            .await?;

        metrics::record_referral_completed();
        metrics::record_rifas_credited("referral_bonus", self.referrer_bonus + self.referred_bonus);

        info!(
            referral_id = %completed.id,
            referrer_id = %completed.referrer_id,
            "referral completed"
        );
        Ok(completed)
    }
}
