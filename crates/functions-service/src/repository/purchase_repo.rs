//! 积分包与充值订单仓储

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::audit_repo::AuditRepository;
use super::ledger_repo::LedgerRepository;
use super::notification_repo::NotificationRepository;
use super::profile_repo::ProfileRepository;
use super::traits::{PurchaseRepositoryTrait, PurchaseStatusOutcome, PurchaseStatusPlan};
use crate::error::{ApiError, Result};
use crate::models::{
    AuditEntry, CreditPackage, CreditPurchase, LedgerKind, NewPurchase, PurchaseStatus,
};

const PURCHASE_COLUMNS: &str = "id, user_id, package_id, credits, price_cents, payment_method, \
     payment_reference, status, note, confirmed_by, confirmed_at, created_at, updated_at";

pub struct PurchaseRepository {
    pool: PgPool,
}

impl PurchaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseRepositoryTrait for PurchaseRepository {
    async fn get_package(&self, id: Uuid) -> Result<Option<CreditPackage>> {
        let package = sqlx::query_as::<_, CreditPackage>(
            r#"
            SELECT id, name, base_credits, bonus_credits, price_cents, active, created_at
            FROM credit_packages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(package)
    }

    async fn create_purchase(
        &self,
        purchase: &NewPurchase,
        audit: &AuditEntry,
    ) -> Result<CreditPurchase> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO credit_purchases \
             (user_id, package_id, credits, price_cents, payment_method, payment_reference) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PURCHASE_COLUMNS}"
        );
        let created = sqlx::query_as::<_, CreditPurchase>(&sql)
            .bind(purchase.user_id)
            .bind(purchase.package_id)
            .bind(purchase.credits)
            .bind(purchase.price_cents)
            .bind(purchase.payment_method)
            .bind(&purchase.payment_reference)
            .fetch_one(&mut *tx)
            .await?;

        let audit = audit.clone().with_target(created.id);
        AuditRepository::record_in_tx(&mut tx, &audit).await?;
        tx.commit().await?;

        Ok(created)
    }

    async fn get_purchase(&self, id: Uuid) -> Result<Option<CreditPurchase>> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM credit_purchases WHERE id = $1");
        let purchase = sqlx::query_as::<_, CreditPurchase>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(purchase)
    }

    /// 状态变更事务
    ///
    /// 锁定订单后重新校验状态机，确认时在同一事务内为买家入账
    async fn apply_status(&self, plan: &PurchaseStatusPlan) -> Result<PurchaseStatusOutcome> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM credit_purchases WHERE id = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, CreditPurchase>(&sql)
            .bind(plan.purchase_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ApiError::PurchaseNotFound(plan.purchase_id))?;

        if !current.status.can_transition_to(plan.status) {
            return Err(ApiError::invalid_transition(current.status, plan.status));
        }

        let confirming = plan.status == PurchaseStatus::Confirmed;
        let sql = format!(
            "UPDATE credit_purchases \
             SET status = $2, note = COALESCE($3, note), \
                 confirmed_by = CASE WHEN $4 THEN $5 ELSE confirmed_by END, \
                 confirmed_at = CASE WHEN $4 THEN NOW() ELSE confirmed_at END, \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {PURCHASE_COLUMNS}"
        );
        let purchase = sqlx::query_as::<_, CreditPurchase>(&sql)
            .bind(plan.purchase_id)
            .bind(plan.status)
            .bind(&plan.note)
            .bind(confirming)
            .bind(plan.admin_id)
            .fetch_one(&mut *tx)
            .await?;

        let credited = if confirming {
            ProfileRepository::adjust_rifas_in_tx(&mut tx, purchase.user_id, purchase.credits)
                .await?;
            LedgerRepository::append_in_tx(
                &mut tx,
                purchase.user_id,
                LedgerKind::CreditPurchase,
                purchase.credits,
                Some(purchase.id),
                &format!("credit purchase {}", purchase.payment_reference),
            )
            .await?;
            purchase.credits
        } else {
            0
        };

        NotificationRepository::insert_in_tx(&mut tx, &purchase.status_notification()).await?;

        let audit = AuditEntry::new(
            plan.admin_id,
            "purchase.status_updated",
            "credit_purchase",
            Some(purchase.id),
        )
        .with_details(json!({
            "from": current.status,
            "to": purchase.status,
            "credited": credited,
            "note": plan.note,
        }));
        AuditRepository::record_in_tx(&mut tx, &audit).await?;

        tx.commit().await?;

        Ok(PurchaseStatusOutcome { purchase, credited })
    }
}
