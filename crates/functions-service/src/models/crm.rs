//! CRM 解锁相关实体

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 广告主对某个任务 CRM 数据的解锁记录
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CrmUnlock {
    pub id: Uuid,
    pub advertiser_id: Uuid,
    pub mission_id: Uuid,
    pub cost: i64,
    pub created_at: DateTime<Utc>,
}

/// 通过审核的参与者（CRM 数据行）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CrmParticipant {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    #[sqlx(default)]
    pub city: Option<String>,
    #[sqlx(default)]
    pub state: Option<String>,
    #[sqlx(default)]
    pub gender: Option<String>,
    #[sqlx(default)]
    pub birth_date: Option<NaiveDate>,
    pub approved_at: Option<DateTime<Utc>>,
}
