//! 充值服务
//!
//! 创建待支付订单，以及管理员确认/取消订单

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use premiads_shared::observability::metrics;
use rand::Rng;
use tracing::{info, instrument};
use validator::Validate;

use super::{random_code, require_admin, require_advertiser_or_admin};
use crate::dto::{PurchaseCreditsRequest, PurchaseStatusResponse, UpdatePurchaseStatusRequest};
use crate::error::{ApiError, Result};
use crate::models::{AuditEntry, CreditPurchase, NewPurchase, Profile};
use crate::repository::{PurchaseRepositoryTrait, PurchaseStatusPlan};

const REFERENCE_PREFIX: &str = "PRM";
const REFERENCE_SUFFIX_LEN: usize = 10;

/// 生成支付参考号，格式为 `PRM-YYYYMMDD-XXXXXXXXXX`
pub fn generate_payment_reference<R: Rng + ?Sized>(rng: &mut R, date: NaiveDate) -> String {
    format!(
        "{}-{}-{}",
        REFERENCE_PREFIX,
        date.format("%Y%m%d"),
        random_code(rng, REFERENCE_SUFFIX_LEN)
    )
}

pub struct PurchaseService {
    purchases: Arc<dyn PurchaseRepositoryTrait>,
}

impl PurchaseService {
    pub fn new(purchases: Arc<dyn PurchaseRepositoryTrait>) -> Self {
        Self { purchases }
    }

    /// 创建待支付订单，确认前不发放 rifas
    #[instrument(skip(self, caller, request), fields(caller_id = %caller.id, package_id = %request.package_id))]
    pub async fn purchase(
        &self,
        caller: &Profile,
        request: PurchaseCreditsRequest,
    ) -> Result<CreditPurchase> {
        require_advertiser_or_admin(caller)?;

        let package = self
            .purchases
            .get_package(request.package_id)
            .await?
            .filter(|p| p.active)
            .ok_or(ApiError::PackageNotFound(request.package_id))?;

        let purchase = NewPurchase {
            user_id: caller.id,
            package_id: package.id,
            credits: package.total_credits(),
            price_cents: package.price_cents,
            payment_method: request.payment_method,
            payment_reference: generate_payment_reference(
                &mut rand::rng(),
                Utc::now().date_naive(),
            ),
        };

        let audit = AuditEntry::new(caller.id, "purchase.created", "credit_purchase", None)
            .with_details(serde_json::json!({
                "packageId": package.id,
                "credits": purchase.credits,
                "priceCents": purchase.price_cents,
            }));

        let created = self.purchases.create_purchase(&purchase, &audit).await?;
        metrics::record_credit_purchase(created.status.as_str());

        info!(
            purchase_id = %created.id,
            reference = %created.payment_reference,
            credits = created.credits,
            "credit purchase created"
        );
        Ok(created)
    }

    #[instrument(skip(self, caller, request), fields(caller_id = %caller.id, purchase_id = %request.purchase_id))]
    pub async fn update_status(
        &self,
        caller: &Profile,
        request: UpdatePurchaseStatusRequest,
    ) -> Result<PurchaseStatusResponse> {
        require_admin(caller)?;
        request.validate()?;

        let current = self
            .purchases
            .get_purchase(request.purchase_id)
            .await?
            .ok_or(ApiError::PurchaseNotFound(request.purchase_id))?;

        if !current.status.can_transition_to(request.status) {
            return Err(ApiError::invalid_transition(current.status, request.status));
        }

        let outcome = self
            .purchases
            .apply_status(&PurchaseStatusPlan {
                purchase_id: current.id,
                status: request.status,
                admin_id: caller.id,
                note: request.note,
            })
            .await?;

        metrics::record_credit_purchase(outcome.purchase.status.as_str());
        if outcome.credited > 0 {
            metrics::record_rifas_credited("credit_purchase", outcome.credited);
        }

        info!(
            status = %outcome.purchase.status,
            credited = outcome.credited,
            "purchase status updated"
        );

        Ok(PurchaseStatusResponse {
            purchase: outcome.purchase,
            credited: outcome.credited,
        })
    }
}
