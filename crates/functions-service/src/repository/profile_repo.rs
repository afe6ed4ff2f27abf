//! 用户档案仓储
//!
//! 除常规查询外，提供事务内的行锁与余额调整函数，供其他仓储在各自事务中复用

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::audit_repo::AuditRepository;
use super::ledger_repo::LedgerRepository;
use super::traits::ProfileRepositoryTrait;
use crate::error::{ApiError, Result};
use crate::models::{AuditEntry, LedgerKind, NewProfile, Profile, UserType};

const PROFILE_COLUMNS: &str = "id, full_name, email, user_type, rifas, cashback_cents, \
     birth_date, gender, city, state, created_at, updated_at";

pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中锁定用户档案（FOR UPDATE）
    pub async fn lock_in_tx(conn: &mut PgConnection, id: Uuid) -> Result<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1 FOR UPDATE");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(profile)
    }

    /// 在事务中调整 rifa 余额，返回调整后的余额
    ///
    /// 余额不足时 CHECK 约束不会被触发，而是返回 InsufficientRifas
    pub async fn adjust_rifas_in_tx(
        conn: &mut PgConnection,
        id: Uuid,
        delta: i64,
    ) -> Result<i64> {
        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE profiles
            SET rifas = rifas + $2, updated_at = NOW()
            WHERE id = $1 AND rifas + $2 >= 0
            RETURNING rifas
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&mut *conn)
        .await?;

        match balance {
            Some(balance) => Ok(balance),
            None => {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT rifas FROM profiles WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&mut *conn)
                        .await?;
                match available {
                    Some(available) => Err(ApiError::InsufficientRifas {
                        required: -delta,
                        available,
                    }),
                    None => Err(ApiError::ProfileMissing(id)),
                }
            }
        }
    }

    /// 在事务中增加 rifa 与现金返还，返回 (rifas, cashback_cents)
    pub async fn credit_rewards_in_tx(
        conn: &mut PgConnection,
        id: Uuid,
        rifas: i64,
        cashback_cents: i64,
    ) -> Result<(i64, i64)> {
        let balances: Option<(i64, i64)> = sqlx::query_as(
            r#"
            UPDATE profiles
            SET rifas = rifas + $2, cashback_cents = cashback_cents + $3, updated_at = NOW()
            WHERE id = $1
            RETURNING rifas, cashback_cents
            "#,
        )
        .bind(id)
        .bind(rifas)
        .bind(cashback_cents)
        .fetch_optional(conn)
        .await?;

        balances.ok_or(ApiError::ProfileMissing(id))
    }
}

#[async_trait]
impl ProfileRepositoryTrait for ProfileRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn create_profile(&self, profile: &NewProfile, audit: &AuditEntry) -> Result<Profile> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO profiles (id, full_name, email, user_type, rifas) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PROFILE_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Profile>(&sql)
            .bind(profile.id)
            .bind(&profile.full_name)
            .bind(&profile.email)
            .bind(profile.user_type)
            .bind(profile.rifas)
            .fetch_one(&mut *tx)
            .await?;

        if created.rifas > 0 {
            LedgerRepository::append_in_tx(
                &mut tx,
                created.id,
                LedgerKind::InitialGrant,
                created.rifas,
                Some(audit.actor_id),
                "initial balance",
            )
            .await?;
        }

        AuditRepository::record_in_tx(&mut tx, audit).await?;
        tx.commit().await?;

        Ok(created)
    }

    async fn list_ids_by_type(&self, user_type: Option<UserType>) -> Result<Vec<Uuid>> {
        let ids = match user_type {
            Some(user_type) => {
                sqlx::query_scalar("SELECT id FROM profiles WHERE user_type = $1 ORDER BY created_at")
                    .bind(user_type)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT id FROM profiles ORDER BY created_at")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(ids)
    }

    async fn existing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let existing = sqlx::query_scalar("SELECT id FROM profiles WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(existing)
    }
}
