//! 积分包与充值订单实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{NotificationKind, PaymentMethod, PurchaseStatus};
use super::notification::NewNotification;

/// 可购买的 rifa 积分包
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CreditPackage {
    pub id: Uuid,
    pub name: String,
    pub base_credits: i64,
    pub bonus_credits: i64,
    pub price_cents: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl CreditPackage {
    /// 到账总额 = 基础额度 + 赠送额度
    pub fn total_credits(&self) -> i64 {
        self.base_credits + self.bonus_credits
    }
}

/// 充值订单
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CreditPurchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub credits: i64,
    pub price_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_reference: String,
    pub status: PurchaseStatus,
    #[sqlx(default)]
    pub note: Option<String>,
    #[sqlx(default)]
    pub confirmed_by: Option<Uuid>,
    #[sqlx(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditPurchase {
    /// 订单状态变更后发给买家的通知
    pub fn status_notification(&self) -> NewNotification {
        let (title, message) = match self.status {
            PurchaseStatus::Confirmed => (
                "Compra confirmada",
                format!("{} rifas foram creditadas na sua conta.", self.credits),
            ),
            PurchaseStatus::Cancelled => (
                "Compra cancelada",
                format!("A compra {} foi cancelada.", self.payment_reference),
            ),
            PurchaseStatus::Failed => (
                "Falha no pagamento",
                format!("O pagamento da compra {} falhou.", self.payment_reference),
            ),
            PurchaseStatus::Pending => (
                "Compra pendente",
                format!("A compra {} aguarda pagamento.", self.payment_reference),
            ),
        };

        NewNotification::new(self.user_id, NotificationKind::PurchaseUpdate, title, message)
            .with_metadata(serde_json::json!({
                "purchaseId": self.id,
                "status": self.status,
                "credits": self.credits,
            }))
    }
}

/// 新建充值订单参数
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub credits: i64,
    pub price_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_reference: String,
}
