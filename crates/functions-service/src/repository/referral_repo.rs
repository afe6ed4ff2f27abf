//! 推荐仓储

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::audit_repo::AuditRepository;
use super::ledger_repo::LedgerRepository;
use super::notification_repo::NotificationRepository;
use super::profile_repo::ProfileRepository;
use super::traits::{ReferralCompletionPlan, ReferralRepositoryTrait};
use crate::error::{ApiError, Result};
use crate::models::{
    AuditEntry, LedgerKind, NewNotification, NotificationKind, Referral, ReferralCode,
};

const REFERRAL_COLUMNS: &str =
    "id, referrer_id, referred_id, code, status, reward_rifas, completed_at, created_at";

pub struct ReferralRepository {
    pool: PgPool,
}

impl ReferralRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferralRepositoryTrait for ReferralRepository {
    async fn find_code_by_user(&self, user_id: Uuid) -> Result<Option<ReferralCode>> {
        let code = sqlx::query_as::<_, ReferralCode>(
            "SELECT user_id, code, created_at FROM referral_codes WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(code)
    }

    async fn insert_code(&self, user_id: Uuid, code: &str) -> Result<Option<ReferralCode>> {
        // 用户已有推荐码或推荐码冲突时均不插入
        let inserted = sqlx::query_as::<_, ReferralCode>(
            r#"
            INSERT INTO referral_codes (user_id, code)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            RETURNING user_id, code, created_at
            "#,
        )
        .bind(user_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn find_code(&self, code: &str) -> Result<Option<ReferralCode>> {
        let code = sqlx::query_as::<_, ReferralCode>(
            "SELECT user_id, code, created_at FROM referral_codes WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(code)
    }

    async fn find_by_referred(&self, referred_id: Uuid) -> Result<Option<Referral>> {
        let sql = format!("SELECT {REFERRAL_COLUMNS} FROM referrals WHERE referred_id = $1");
        let referral = sqlx::query_as::<_, Referral>(&sql)
            .bind(referred_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(referral)
    }

    async fn create_referral(
        &self,
        referrer_id: Uuid,
        referred_id: Uuid,
        code: &str,
    ) -> Result<Referral> {
        let sql = format!(
            "INSERT INTO referrals (referrer_id, referred_id, code) VALUES ($1, $2, $3) \
             ON CONFLICT (referred_id) DO NOTHING RETURNING {REFERRAL_COLUMNS}"
        );
        let referral = sqlx::query_as::<_, Referral>(&sql)
            .bind(referrer_id)
            .bind(referred_id)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        referral.ok_or_else(|| {
            ApiError::AlreadyProcessed(format!("user {} has already been referred", referred_id))
        })
    }

    /// 推荐完成事务：锁定推荐关系 -> 标记完成 -> 双方入账 -> 流水 -> 通知 -> 审计
    async fn complete(&self, plan: &ReferralCompletionPlan) -> Result<Referral> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {REFERRAL_COLUMNS} FROM referrals WHERE referred_id = $1 FOR UPDATE");
        let pending = sqlx::query_as::<_, Referral>(&sql)
            .bind(plan.referred_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ApiError::ReferralNotFound(plan.referred_id))?;

        if !pending.is_pending() {
            return Err(ApiError::AlreadyProcessed(format!(
                "referral {} is already completed",
                pending.id
            )));
        }

        let sql = format!(
            "UPDATE referrals SET status = 'completed', reward_rifas = $2, completed_at = NOW() \
             WHERE id = $1 RETURNING {REFERRAL_COLUMNS}"
        );
        let referral = sqlx::query_as::<_, Referral>(&sql)
            .bind(pending.id)
            .bind(plan.referrer_bonus)
            .fetch_one(&mut *tx)
            .await?;

        if plan.referrer_bonus > 0 {
            ProfileRepository::adjust_rifas_in_tx(&mut tx, referral.referrer_id, plan.referrer_bonus)
                .await?;
            LedgerRepository::append_in_tx(
                &mut tx,
                referral.referrer_id,
                LedgerKind::ReferralBonus,
                plan.referrer_bonus,
                Some(referral.id),
                "referral bonus",
            )
            .await?;
        }

        if plan.referred_bonus > 0 {
            ProfileRepository::adjust_rifas_in_tx(&mut tx, referral.referred_id, plan.referred_bonus)
                .await?;
            LedgerRepository::append_in_tx(
                &mut tx,
                referral.referred_id,
                LedgerKind::ReferralBonus,
                plan.referred_bonus,
                Some(referral.id),
                "referred user bonus",
            )
            .await?;
        }

        let metadata = json!({ "referralId": referral.id });
        let notifications = [
            NewNotification::new(
                referral.referrer_id,
                NotificationKind::Referral,
                "Indicação concluída",
                format!(
                    "Seu indicado completou a primeira missão. Você ganhou {} rifas!",
                    plan.referrer_bonus
                ),
            )
            .with_metadata(metadata.clone()),
            NewNotification::new(
                referral.referred_id,
                NotificationKind::Referral,
                "Bônus de indicação",
                format!("Você ganhou {} rifas de boas-vindas!", plan.referred_bonus),
            )
            .with_metadata(metadata),
        ];
        for notification in &notifications {
            NotificationRepository::insert_in_tx(&mut tx, notification).await?;
        }

        let audit = AuditEntry::new(plan.actor_id, "referral.completed", "referral", Some(referral.id))
            .with_details(json!({
                "referrerId": referral.referrer_id,
                "referredId": referral.referred_id,
                "referrerBonus": plan.referrer_bonus,
                "referredBonus": plan.referred_bonus,
            }));
        AuditRepository::record_in_tx(&mut tx, &audit).await?;

        tx.commit().await?;

        Ok(referral)
    }
}
