//! 推荐实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ReferralStatus;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReferralCode {
    pub user_id: Uuid,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

/// 推荐关系，每个被推荐用户只能有一条
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub code: String,
    pub status: ReferralStatus,
    pub reward_rifas: i64,
    #[sqlx(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Referral {
    pub fn is_pending(&self) -> bool {
        self.status == ReferralStatus::Pending
    }
}
