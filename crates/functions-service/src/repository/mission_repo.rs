//! 任务与提交仓储
//!
//! 审核通过在一个事务内完成：锁定提交 -> 更新状态 -> 奖励记录 -> 入账
//! -> 账本流水 -> 任务完成数 -> 通知 -> 审计，任何一步失败则整体回滚

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::audit_repo::AuditRepository;
use super::ledger_repo::LedgerRepository;
use super::notification_repo::NotificationRepository;
use super::profile_repo::ProfileRepository;
use super::traits::{ApprovalPlan, ApprovalRecord, MissionRepositoryTrait, RejectionPlan};
use crate::error::{ApiError, Result};
use crate::models::{LedgerKind, Mission, MissionStatus, Submission, SubmissionStatus};

const SUBMISSION_COLUMNS: &str = "id, mission_id, user_id, status, submission_data, feedback, \
     validated_by, validated_at, created_at";

pub struct MissionRepository {
    pool: PgPool,
}

impl MissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 锁定待审核的提交，已处理过的提交返回 AlreadyProcessed
    async fn lock_pending_submission(conn: &mut PgConnection, id: Uuid) -> Result<Submission> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM mission_submissions WHERE id = $1 FOR UPDATE"
        );
        let submission = sqlx::query_as::<_, Submission>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or(ApiError::SubmissionNotFound(id))?;

        if !submission.is_pending() {
            return Err(ApiError::AlreadyProcessed(format!(
                "submission {} is already {}",
                id,
                submission.status.as_str()
            )));
        }

        Ok(submission)
    }

    async fn set_submission_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: SubmissionStatus,
        reviewer_id: Uuid,
        feedback: Option<&str>,
    ) -> Result<Submission> {
        let sql = format!(
            "UPDATE mission_submissions \
             SET status = $2, validated_by = $3, validated_at = NOW(), feedback = $4 \
             WHERE id = $1 RETURNING {SUBMISSION_COLUMNS}"
        );
        let submission = sqlx::query_as::<_, Submission>(&sql)
            .bind(id)
            .bind(status)
            .bind(reviewer_id)
            .bind(feedback)
            .fetch_one(conn)
            .await?;
        Ok(submission)
    }
}

#[async_trait]
impl MissionRepositoryTrait for MissionRepository {
    async fn get_mission(&self, id: Uuid) -> Result<Option<Mission>> {
        let mission = sqlx::query_as::<_, Mission>(
            r#"
            SELECT id, advertiser_id, title, description, status, rifas_reward,
                   cashback_reward_cents, max_participants, completions, created_at, updated_at
            FROM missions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(mission)
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM mission_submissions WHERE id = $1");
        let submission = sqlx::query_as::<_, Submission>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(submission)
    }

    async fn approve_submission(&self, plan: &ApprovalPlan) -> Result<ApprovalRecord> {
        let mut tx = self.pool.begin().await?;

        Self::lock_pending_submission(&mut tx, plan.submission_id).await?;

        let submission = Self::set_submission_status(
            &mut tx,
            plan.submission_id,
            SubmissionStatus::Approved,
            plan.reviewer_id,
            plan.feedback.as_deref(),
        )
        .await?;

        // submission_id 唯一约束保证同一提交只发放一次
        sqlx::query(
            r#"
            INSERT INTO mission_rewards (submission_id, mission_id, user_id, rifas_earned, cashback_earned_cents)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(plan.submission_id)
        .bind(plan.mission_id)
        .bind(plan.participant_id)
        .bind(plan.rifas)
        .bind(plan.cashback_cents)
        .execute(&mut *tx)
        .await?;

        let (rifas_balance, cashback_balance_cents) = ProfileRepository::credit_rewards_in_tx(
            &mut tx,
            plan.participant_id,
            plan.rifas,
            plan.cashback_cents,
        )
        .await?;

        if plan.rifas > 0 {
            LedgerRepository::append_in_tx(
                &mut tx,
                plan.participant_id,
                LedgerKind::MissionReward,
                plan.rifas,
                Some(plan.submission_id),
                "mission reward",
            )
            .await?;
        }

        let mission_status: MissionStatus = sqlx::query_scalar(
            r#"
            UPDATE missions
            SET completions = completions + 1,
                status = CASE
                    WHEN max_participants IS NOT NULL AND completions + 1 >= max_participants
                        THEN 'encerrada'
                    ELSE status
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING status
            "#,
        )
        .bind(plan.mission_id)
        .fetch_one(&mut *tx)
        .await?;

        NotificationRepository::insert_in_tx(&mut tx, &plan.notification).await?;
        AuditRepository::record_in_tx(&mut tx, &plan.audit).await?;

        tx.commit().await?;

        let mission_closed = mission_status == MissionStatus::Encerrada;
        debug!(
            submission_id = %plan.submission_id,
            mission_closed,
            "approval transaction committed"
        );

        Ok(ApprovalRecord {
            submission,
            rifas_balance,
            cashback_balance_cents,
            mission_closed,
        })
    }

    async fn reject_submission(&self, plan: &RejectionPlan) -> Result<Submission> {
        let mut tx = self.pool.begin().await?;

        Self::lock_pending_submission(&mut tx, plan.submission_id).await?;

        let submission = Self::set_submission_status(
            &mut tx,
            plan.submission_id,
            SubmissionStatus::Rejected,
            plan.reviewer_id,
            Some(&plan.feedback),
        )
        .await?;

        NotificationRepository::insert_in_tx(&mut tx, &plan.notification).await?;
        AuditRepository::record_in_tx(&mut tx, &plan.audit).await?;

        tx.commit().await?;

        Ok(submission)
    }

    async fn count_approved_submissions(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM mission_submissions WHERE user_id = $1 AND status = 'approved'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
