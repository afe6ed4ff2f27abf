//! 任务与任务提交实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{MissionStatus, SubmissionStatus};

/// 广告主创建的任务
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: Uuid,
    pub advertiser_id: Uuid,
    pub title: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub status: MissionStatus,
    /// 通过审核后发放的 rifa
    pub rifas_reward: i64,
    /// 通过审核后发放的现金返还（分）
    pub cashback_reward_cents: i64,
    /// 参与上限（null 表示不限）
    #[sqlx(default)]
    pub max_participants: Option<i32>,
    /// 已通过审核的完成次数
    pub completions: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mission {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.advertiser_id == user_id
    }

    /// 再完成一次后是否达到参与上限
    pub fn reaches_capacity_after_completion(&self) -> bool {
        self.max_participants
            .is_some_and(|max| self.completions + 1 >= max)
    }
}

/// 参与者对任务的提交
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub mission_id: Uuid,
    pub user_id: Uuid,
    pub status: SubmissionStatus,
    pub submission_data: serde_json::Value,
    #[sqlx(default)]
    pub feedback: Option<String>,
    #[sqlx(default)]
    pub validated_by: Option<Uuid>,
    #[sqlx(default)]
    pub validated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }
}

/// 任务奖励发放记录，每个通过的提交唯一一条
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MissionReward {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub mission_id: Uuid,
    pub user_id: Uuid,
    pub rifas_earned: i64,
    pub cashback_earned_cents: i64,
    pub rewarded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mission(max: Option<i32>, completions: i32) -> Mission {
        Mission {
            id: Uuid::new_v4(),
            advertiser_id: Uuid::new_v4(),
            title: "Siga nossa página".to_string(),
            description: None,
            status: MissionStatus::Ativa,
            rifas_reward: 10,
            cashback_reward_cents: 150,
            max_participants: max,
            completions,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_capacity_detection() {
        assert!(!mission(None, 1_000).reaches_capacity_after_completion());
        assert!(!mission(Some(10), 8).reaches_capacity_after_completion());
        assert!(mission(Some(10), 9).reaches_capacity_after_completion());
        assert!(mission(Some(1), 0).reaches_capacity_after_completion());
    }

    #[test]
    fn test_ownership() {
        let m = mission(None, 0);
        assert!(m.is_owned_by(m.advertiser_id));
        assert!(!m.is_owned_by(Uuid::new_v4()));
    }
}
