//! 抽奖仓储

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::audit_repo::AuditRepository;
use super::ledger_repo::LedgerRepository;
use super::notification_repo::NotificationRepository;
use super::profile_repo::ProfileRepository;
use super::traits::{
    DrawPlan, DrawResult, EntryPurchaseOutcome, EntryPurchasePlan, RaffleRepositoryTrait,
};
use crate::error::{ApiError, Result};
use crate::models::{
    AuditEntry, DrawOutcome, LedgerKind, NewRaffle, Raffle, RaffleEntry, RaffleStatus,
};

const RAFFLE_COLUMNS: &str = "id, title, description, prize, entry_cost, max_entries, status, \
     draw_date, winner_id, winning_number, draw_seed_hash, drawn_at, created_by, created_at, updated_at";

pub struct RaffleRepository {
    pool: PgPool,
}

impl RaffleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_in_tx(conn: &mut PgConnection, id: Uuid) -> Result<Option<Raffle>> {
        let sql = format!("SELECT {RAFFLE_COLUMNS} FROM raffles WHERE id = $1 FOR UPDATE");
        let raffle = sqlx::query_as::<_, Raffle>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(raffle)
    }

    async fn list_entries_in_tx(
        conn: &mut PgConnection,
        raffle_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Vec<RaffleEntry>> {
        let entries = sqlx::query_as::<_, RaffleEntry>(
            r#"
            SELECT id, raffle_id, user_id, ticket_number, created_at
            FROM raffle_entries
            WHERE raffle_id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            ORDER BY ticket_number
            "#,
        )
        .bind(raffle_id)
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(entries)
    }
}

#[async_trait]
impl RaffleRepositoryTrait for RaffleRepository {
    async fn create(&self, raffle: &NewRaffle, audit: &AuditEntry) -> Result<Raffle> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO raffles (title, description, prize, entry_cost, max_entries, draw_date, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {RAFFLE_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Raffle>(&sql)
            .bind(&raffle.title)
            .bind(&raffle.description)
            .bind(&raffle.prize)
            .bind(raffle.entry_cost)
            .bind(raffle.max_entries)
            .bind(raffle.draw_date)
            .bind(raffle.created_by)
            .fetch_one(&mut *tx)
            .await?;

        let audit = audit.clone().with_target(created.id);
        AuditRepository::record_in_tx(&mut tx, &audit).await?;
        tx.commit().await?;

        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Raffle>> {
        let sql = format!("SELECT {RAFFLE_COLUMNS} FROM raffles WHERE id = $1");
        let raffle = sqlx::query_as::<_, Raffle>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(raffle)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: RaffleStatus,
        to: RaffleStatus,
        audit: &AuditEntry,
    ) -> Result<Option<Raffle>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE raffles SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2 RETURNING {RAFFLE_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Raffle>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(&mut *tx)
            .await?;

        if updated.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        AuditRepository::record_in_tx(&mut tx, audit).await?;
        tx.commit().await?;

        Ok(updated)
    }

    /// 购券事务：锁定抽奖 -> 检查状态与容量 -> 锁定档案 -> 校验余额
    /// -> 扣减 -> 账本流水 -> 连续分配券号
    async fn buy_entries(&self, plan: &EntryPurchasePlan) -> Result<EntryPurchaseOutcome> {
        let mut tx = self.pool.begin().await?;

        let raffle = Self::lock_in_tx(&mut tx, plan.raffle_id)
            .await?
            .ok_or(ApiError::RaffleNotFound(plan.raffle_id))?;

        if raffle.status != RaffleStatus::Active {
            return Err(ApiError::NotEligible(format!(
                "raffle is {}, entries can only be bought while active",
                raffle.status
            )));
        }

        let (sold, max_ticket): (i64, Option<i32>) = sqlx::query_as(
            "SELECT COUNT(*), MAX(ticket_number) FROM raffle_entries WHERE raffle_id = $1",
        )
        .bind(plan.raffle_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(remaining) = raffle.remaining_capacity(sold) {
            if i64::from(plan.quantity) > remaining {
                return Err(ApiError::NotEligible(format!(
                    "only {} entries left for this raffle",
                    remaining
                )));
            }
        }

        let profile = ProfileRepository::lock_in_tx(&mut tx, plan.user_id)
            .await?
            .ok_or(ApiError::ProfileMissing(plan.user_id))?;

        let total_cost = raffle.total_cost(plan.quantity).ok_or_else(|| {
            ApiError::Validation("total entry cost exceeds the supported range".to_string())
        })?;
        if !profile.can_afford(total_cost) {
            return Err(ApiError::InsufficientRifas {
                required: total_cost,
                available: profile.rifas,
            });
        }

        let rifas_balance =
            ProfileRepository::adjust_rifas_in_tx(&mut tx, plan.user_id, -total_cost).await?;

        LedgerRepository::append_in_tx(
            &mut tx,
            plan.user_id,
            LedgerKind::RaffleEntry,
            total_cost,
            Some(plan.raffle_id),
            &format!("{} raffle entries", plan.quantity),
        )
        .await?;

        let first = max_ticket.unwrap_or(0) + 1;
        let ticket_numbers: Vec<i32> = (first..first + plan.quantity).collect();

        sqlx::query(
            r#"
            INSERT INTO raffle_entries (raffle_id, user_id, ticket_number)
            SELECT $1, $2, UNNEST($3::int[])
            "#,
        )
        .bind(plan.raffle_id)
        .bind(plan.user_id)
        .bind(&ticket_numbers)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(EntryPurchaseOutcome {
            ticket_numbers,
            total_cost,
            rifas_balance,
        })
    }

    async fn list_entries(
        &self,
        raffle_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Vec<RaffleEntry>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_entries_in_tx(&mut conn, raffle_id, user_id).await
    }

    /// 开奖事务：锁定抽奖 -> 读取全部券 -> 按种子选出中奖者 -> 写入结果、通知与审计
    ///
    /// 购券事务同样锁定抽奖行，开奖看到的券集合即最终集合
    async fn draw(&self, plan: &DrawPlan) -> Result<DrawResult> {
        let mut tx = self.pool.begin().await?;

        let raffle = Self::lock_in_tx(&mut tx, plan.raffle_id)
            .await?
            .ok_or(ApiError::RaffleNotFound(plan.raffle_id))?;

        match raffle.status {
            RaffleStatus::Active => {}
            RaffleStatus::Drawn => {
                return Err(ApiError::AlreadyProcessed(format!(
                    "raffle {} has already been drawn",
                    plan.raffle_id
                )));
            }
            other => return Err(ApiError::invalid_transition(other, RaffleStatus::Drawn)),
        }

        let entries = Self::list_entries_in_tx(&mut tx, plan.raffle_id, None).await?;
        let outcome = DrawOutcome::compute(plan.raffle_id, &entries, &plan.seed)
            .ok_or_else(|| ApiError::NotEligible("raffle has no entries".to_string()))?;

        let sql = format!(
            "UPDATE raffles \
             SET status = 'drawn', winner_id = $2, winning_number = $3, draw_seed_hash = $4, \
                 drawn_at = NOW(), updated_at = NOW() \
             WHERE id = $1 RETURNING {RAFFLE_COLUMNS}"
        );
        let drawn = sqlx::query_as::<_, Raffle>(&sql)
            .bind(plan.raffle_id)
            .bind(outcome.winner_id)
            .bind(outcome.winning_number)
            .bind(&outcome.seed_hash)
            .fetch_one(&mut *tx)
            .await?;

        NotificationRepository::insert_in_tx(&mut tx, &outcome.winner_notification(&raffle))
            .await?;
        AuditRepository::record_in_tx(&mut tx, &outcome.audit(plan.raffle_id, plan.drawn_by))
            .await?;
        tx.commit().await?;

        Ok(DrawResult {
            raffle: drawn,
            outcome,
        })
    }
}
