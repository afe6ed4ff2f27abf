//! CRM 解锁仓储

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::audit_repo::AuditRepository;
use super::ledger_repo::LedgerRepository;
use super::profile_repo::ProfileRepository;
use super::traits::{CrmRepositoryTrait, CrmUnlockOutcome, CrmUnlockPlan};
use crate::error::{ApiError, Result};
use crate::models::{CrmParticipant, CrmUnlock, LedgerKind};

pub struct CrmRepository {
    pool: PgPool,
}

impl CrmRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_unlock_with(
        conn: &mut PgConnection,
        advertiser_id: Uuid,
        mission_id: Uuid,
    ) -> Result<Option<CrmUnlock>> {
        let unlock = sqlx::query_as::<_, CrmUnlock>(
            r#"
            SELECT id, advertiser_id, mission_id, cost, created_at
            FROM crm_unlocks
            WHERE advertiser_id = $1 AND mission_id = $2
            "#,
        )
        .bind(advertiser_id)
        .bind(mission_id)
        .fetch_optional(conn)
        .await?;

        Ok(unlock)
    }
}

#[async_trait]
impl CrmRepositoryTrait for CrmRepository {
    async fn find_unlock(
        &self,
        advertiser_id: Uuid,
        mission_id: Uuid,
    ) -> Result<Option<CrmUnlock>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_unlock_with(&mut conn, advertiser_id, mission_id).await
    }

    /// 解锁事务
    ///
    /// 先锁定广告主档案，同一广告主的并发解锁在此串行化，
    /// 锁内再次检查是否已解锁，保证只扣费一次
    async fn unlock(&self, plan: &CrmUnlockPlan) -> Result<CrmUnlockOutcome> {
        let mut tx = self.pool.begin().await?;

        let profile = ProfileRepository::lock_in_tx(&mut tx, plan.advertiser_id)
            .await?
            .ok_or(ApiError::ProfileMissing(plan.advertiser_id))?;

        if let Some(unlock) =
            Self::find_unlock_with(&mut tx, plan.advertiser_id, plan.mission_id).await?
        {
            tx.rollback().await?;
            return Ok(CrmUnlockOutcome {
                unlock,
                charged: false,
                rifas_balance: profile.rifas,
            });
        }

        if !profile.can_afford(plan.cost) {
            return Err(ApiError::InsufficientRifas {
                required: plan.cost,
                available: profile.rifas,
            });
        }

        let rifas_balance =
            ProfileRepository::adjust_rifas_in_tx(&mut tx, plan.advertiser_id, -plan.cost).await?;

        LedgerRepository::append_in_tx(
            &mut tx,
            plan.advertiser_id,
            LedgerKind::CrmUnlock,
            plan.cost,
            Some(plan.mission_id),
            "crm data unlock",
        )
        .await?;

        let unlock = sqlx::query_as::<_, CrmUnlock>(
            r#"
            INSERT INTO crm_unlocks (advertiser_id, mission_id, cost)
            VALUES ($1, $2, $3)
            RETURNING id, advertiser_id, mission_id, cost, created_at
            "#,
        )
        .bind(plan.advertiser_id)
        .bind(plan.mission_id)
        .bind(plan.cost)
        .fetch_one(&mut *tx)
        .await?;

        AuditRepository::record_in_tx(&mut tx, &plan.audit).await?;
        tx.commit().await?;

        Ok(CrmUnlockOutcome {
            unlock,
            charged: true,
            rifas_balance,
        })
    }

    async fn list_approved_participants(&self, mission_id: Uuid) -> Result<Vec<CrmParticipant>> {
        let participants = sqlx::query_as::<_, CrmParticipant>(
            r#"
            SELECT DISTINCT ON (p.id)
                   p.id AS user_id, p.full_name, p.email, p.city, p.state, p.gender,
                   p.birth_date, s.validated_at AS approved_at
            FROM mission_submissions s
            JOIN profiles p ON p.id = s.user_id
            WHERE s.mission_id = $1 AND s.status = 'approved'
            ORDER BY p.id, s.validated_at DESC
            "#,
        )
        .bind(mission_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }
}
