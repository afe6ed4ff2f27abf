//! CRM 数据解锁服务
//!
//! 广告主支付 rifa 后可查看其任务下通过审核的参与者数据及人口统计聚合。
//! 管理员无需解锁即可查看。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use premiads_shared::observability::metrics;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::require_advertiser_or_admin;
use crate::dto::{CrmDataResponse, CrmParticipantDto, CrmStatusResponse, Demographics};
use crate::error::{ApiError, Result};
use crate::models::{AuditEntry, CrmParticipant, Mission, Profile, age_on};
use crate::repository::{CrmRepositoryTrait, CrmUnlockPlan, MissionRepositoryTrait};

const UNKNOWN: &str = "unknown";

/// 年龄分段
pub fn age_bucket(age: Option<i32>) -> &'static str {
    match age {
        None => UNKNOWN,
        Some(a) if a < 0 => UNKNOWN,
        Some(a) if a < 18 => "<18",
        Some(a) if a <= 24 => "18-24",
        Some(a) if a <= 34 => "25-34",
        Some(a) if a <= 44 => "35-44",
        Some(a) if a <= 54 => "45-54",
        Some(_) => "55+",
    }
}

fn normalized_or_unknown(value: Option<&str>, upper: bool) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if upper => v.to_uppercase(),
        Some(v) => v.to_lowercase(),
        None => UNKNOWN.to_string(),
    }
}

/// 按性别、年龄段、州聚合参与者
pub fn aggregate_demographics(participants: &[CrmParticipant], today: NaiveDate) -> Demographics {
    let mut by_gender = BTreeMap::new();
    let mut by_age_range = BTreeMap::new();
    let mut by_state = BTreeMap::new();

    for p in participants {
        let age = p.birth_date.map(|birth| age_on(birth, today));
        *by_gender
            .entry(normalized_or_unknown(p.gender.as_deref(), false))
            .or_insert(0) += 1;
        *by_age_range.entry(age_bucket(age).to_string()).or_insert(0) += 1;
        *by_state
            .entry(normalized_or_unknown(p.state.as_deref(), true))
            .or_insert(0) += 1;
    }

    Demographics {
        by_gender,
        by_age_range,
        by_state,
    }
}

pub struct CrmService {
    missions: Arc<dyn MissionRepositoryTrait>,
    crm: Arc<dyn CrmRepositoryTrait>,
    unlock_cost: i64,
}

impl CrmService {
    pub fn new(
        missions: Arc<dyn MissionRepositoryTrait>,
        crm: Arc<dyn CrmRepositoryTrait>,
        unlock_cost: i64,
    ) -> Self {
        Self {
            missions,
            crm,
            unlock_cost,
        }
    }

    /// 角色检查在查询任务之前，参与者不会探测到任务是否存在
    async fn authorize(&self, caller: &Profile, mission_id: Uuid) -> Result<Mission> {
        require_advertiser_or_admin(caller)?;

        let mission = self
            .missions
            .get_mission(mission_id)
            .await?
            .ok_or(ApiError::MissionNotFound(mission_id))?;

        if !caller.is_admin() && !mission.is_owned_by(caller.id) {
            return Err(ApiError::Forbidden(
                "crm data is only available to the mission owner".to_string(),
            ));
        }

        Ok(mission)
    }

    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn status(&self, caller: &Profile, mission_id: Uuid) -> Result<CrmStatusResponse> {
        let mission = self.authorize(caller, mission_id).await?;

        let unlock = if caller.is_admin() {
            None
        } else {
            self.crm.find_unlock(caller.id, mission.id).await?
        };

        Ok(CrmStatusResponse {
            mission_id: mission.id,
            unlocked: caller.is_admin() || unlock.is_some(),
            cost: self.unlock_cost,
            unlocked_at: unlock.map(|u| u.created_at),
        })
    }

    /// 解锁并返回数据，重复解锁不会再次扣费
    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn unlock(&self, caller: &Profile, mission_id: Uuid) -> Result<CrmDataResponse> {
        let mission = self.authorize(caller, mission_id).await?;

        if caller.is_admin() {
            return self.payload(mission.id, false, None).await;
        }

        let outcome = self
            .crm
            .unlock(&CrmUnlockPlan {
                advertiser_id: caller.id,
                mission_id: mission.id,
                cost: self.unlock_cost,
                audit: AuditEntry::new(caller.id, "crm.unlocked", "mission", Some(mission.id))
                    .with_details(json!({ "cost": self.unlock_cost })),
            })
            .await?;

        metrics::record_crm_unlock(outcome.charged);
        if outcome.charged {
            metrics::record_rifas_debited("crm_unlock", outcome.unlock.cost);
            info!(
                mission_id = %mission.id,
                cost = outcome.unlock.cost,
                rifas_balance = outcome.rifas_balance,
                "crm data unlocked"
            );
        }

        self.payload(mission.id, outcome.charged, Some(outcome.rifas_balance))
            .await
    }

    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn data(&self, caller: &Profile, mission_id: Uuid) -> Result<CrmDataResponse> {
        let mission = self.authorize(caller, mission_id).await?;

        if !caller.is_admin() && self.crm.find_unlock(caller.id, mission.id).await?.is_none() {
            return Err(ApiError::Forbidden(
                "crm data has not been unlocked for this mission".to_string(),
            ));
        }

        self.payload(mission.id, false, None).await
    }

    async fn payload(
        &self,
        mission_id: Uuid,
        charged: bool,
        rifas_balance: Option<i64>,
    ) -> Result<CrmDataResponse> {
        let participants = self.crm.list_approved_participants(mission_id).await?;
        let today = Utc::now().date_naive();
        let demographics = aggregate_demographics(&participants, today);

        let participants: Vec<CrmParticipantDto> = participants
            .into_iter()
            .map(|p| {
                let age = p.birth_date.map(|birth| age_on(birth, today));
                CrmParticipantDto::from_participant(p, age)
            })
            .collect();

        Ok(CrmDataResponse {
            mission_id,
            total_participants: participants.len(),
            participants,
            demographics,
            charged,
            rifas_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CrmUnlock, MissionStatus, UserType};
    use crate::repository::{CrmUnlockOutcome, MockCrmRepositoryTrait, MockMissionRepositoryTrait};
    use crate::service::test_support::profile;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn participant(gender: Option<&str>, birth: Option<NaiveDate>, state: Option<&str>) -> CrmParticipant {
        CrmParticipant {
            user_id: Uuid::new_v4(),
            full_name: "Carla Dias".to_string(),
            email: "carla@example.com".to_string(),
            city: Some("Recife".to_string()),
            state: state.map(str::to_string),
            gender: gender.map(str::to_string),
            birth_date: birth,
            approved_at: None,
        }
    }

    fn mission(advertiser_id: Uuid) -> Mission {
        Mission {
            id: Uuid::new_v4(),
            advertiser_id,
            title: "Avalie nosso app".to_string(),
            description: None,
            status: MissionStatus::Ativa,
            rifas_reward: 5,
            cashback_reward_cents: 0,
            max_participants: None,
            completions: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn unlock_row(advertiser_id: Uuid, mission_id: Uuid) -> CrmUnlock {
        CrmUnlock {
            id: Uuid::new_v4(),
            advertiser_id,
            mission_id,
            cost: 50,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_age_buckets() {
        assert_eq!(age_bucket(None), "unknown");
        assert_eq!(age_bucket(Some(-1)), "unknown");
        assert_eq!(age_bucket(Some(17)), "<18");
        assert_eq!(age_bucket(Some(18)), "18-24");
        assert_eq!(age_bucket(Some(24)), "18-24");
        assert_eq!(age_bucket(Some(25)), "25-34");
        assert_eq!(age_bucket(Some(44)), "35-44");
        assert_eq!(age_bucket(Some(54)), "45-54");
        assert_eq!(age_bucket(Some(55)), "55+");
        assert_eq!(age_bucket(Some(90)), "55+");
    }

    #[test]
    fn test_aggregate_demographics() {
        let today = date(2025, 1, 1);
        let participants = vec![
            participant(Some("Feminino"), Some(date(2000, 1, 1)), Some("pe")),
            participant(Some("feminino "), Some(date(1990, 6, 1)), Some("PE")),
            participant(Some("masculino"), Some(date(2010, 1, 1)), Some("SP")),
            participant(None, None, None),
            participant(Some(""), None, Some("  ")),
        ];

        let demographics = aggregate_demographics(&participants, today);

        assert_eq!(demographics.by_gender.get("feminino"), Some(&2));
        assert_eq!(demographics.by_gender.get("masculino"), Some(&1));
        assert_eq!(demographics.by_gender.get("unknown"), Some(&2));

        assert_eq!(demographics.by_age_range.get("25-34"), Some(&2));
        assert_eq!(demographics.by_age_range.get("<18"), Some(&1));
        assert_eq!(demographics.by_age_range.get("unknown"), Some(&2));

        assert_eq!(demographics.by_state.get("PE"), Some(&2));
        assert_eq!(demographics.by_state.get("SP"), Some(&1));
        assert_eq!(demographics.by_state.get("unknown"), Some(&2));

        let total: u64 = demographics.by_age_range.values().sum();
        assert_eq!(total, participants.len() as u64);
    }

    #[tokio::test]
    async fn test_participant_forbidden_before_lookup() {
        let participant = profile(UserType::Participante, 1_000);
        let mut missions = MockMissionRepositoryTrait::new();
        missions.expect_get_mission().never();

        let service = CrmService::new(Arc::new(missions), Arc::new(MockCrmRepositoryTrait::new()), 50);
        let err = service.unlock(&participant, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_foreign_mission_forbidden() {
        let advertiser = profile(UserType::Anunciante, 1_000);
        let m = mission(Uuid::new_v4());
        let mission_id = m.id;

        let mut missions = MockMissionRepositoryTrait::new();
        missions.expect_get_mission().returning(move |_| Ok(Some(m.clone())));
        let mut crm = MockCrmRepositoryTrait::new();
        crm.expect_unlock().never();

        let service = CrmService::new(Arc::new(missions), Arc::new(crm), 50);
        let err = service.unlock(&advertiser, mission_id).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_unlock_charges_configured_cost() {
        let advertiser = profile(UserType::Anunciante, 120);
        let advertiser_id = advertiser.id;
        let m = mission(advertiser_id);
        let mission_id = m.id;

        let mut missions = MockMissionRepositoryTrait::new();
        missions.expect_get_mission().returning(move |_| Ok(Some(m.clone())));

        let mut crm = MockCrmRepositoryTrait::new();
        crm.expect_unlock()
            .withf(move |plan| {
                plan.advertiser_id == advertiser_id && plan.mission_id == mission_id && plan.cost == 50
            })
            .times(1)
            .returning(move |plan| {
                Ok(CrmUnlockOutcome {
                    unlock: unlock_row(plan.advertiser_id, plan.mission_id),
                    charged: true,
                    rifas_balance: 70,
                })
            });
        crm.expect_list_approved_participants()
            .returning(|_| Ok(vec![participant(Some("feminino"), None, Some("RJ"))]));

        let service = CrmService::new(Arc::new(missions), Arc::new(crm), 50);
        let data = service.unlock(&advertiser, mission_id).await.unwrap();

        assert!(data.charged);
        assert_eq!(data.rifas_balance, Some(70));
        assert_eq!(data.total_participants, 1);
        assert_eq!(data.demographics.by_state.get("RJ"), Some(&1));
    }

    #[tokio::test]
    async fn test_insufficient_rifas_propagates() {
        let advertiser = profile(UserType::Anunciante, 10);
        let m = mission(advertiser.id);
        let mission_id = m.id;

        let mut missions = MockMissionRepositoryTrait::new();
        missions.expect_get_mission().returning(move |_| Ok(Some(m.clone())));
        let mut crm = MockCrmRepositoryTrait::new();
        crm.expect_unlock().returning(|plan| {
            Err(ApiError::InsufficientRifas {
                required: plan.cost,
                available: 10,
            })
        });
        crm.expect_list_approved_participants().never();

        let service = CrmService::new(Arc::new(missions), Arc::new(crm), 50);
        let err = service.unlock(&advertiser, mission_id).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_data_requires_unlock() {
        let advertiser = profile(UserType::Anunciante, 0);
        let m = mission(advertiser.id);
        let mission_id = m.id;

        let mut missions = MockMissionRepositoryTrait::new();
        missions.expect_get_mission().returning(move |_| Ok(Some(m.clone())));
        let mut crm = MockCrmRepositoryTrait::new();
        crm.expect_find_unlock().returning(|_, _| Ok(None));

        let service = CrmService::new(Arc::new(missions), Arc::new(crm), 50);
        let err = service.data(&advertiser, mission_id).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_status_reports_unlock() {
        let advertiser = profile(UserType::Anunciante, 0);
        let advertiser_id = advertiser.id;
        let m = mission(advertiser_id);
        let mission_id = m.id;

        let mut missions = MockMissionRepositoryTrait::new();
        missions.expect_get_mission().returning(move |_| Ok(Some(m.clone())));
        let mut crm = MockCrmRepositoryTrait::new();
        crm.expect_find_unlock()
            .returning(move |a, mid| Ok(Some(unlock_row(a, mid))));

        let service = CrmService::new(Arc::new(missions), Arc::new(crm), 50);
        let status = service.status(&advertiser, mission_id).await.unwrap();
        assert!(status.unlocked);
        assert_eq!(status.cost, 50);
        assert!(status.unlocked_at.is_some());
    }

    #[tokio::test]
    async fn test_admin_reads_without_charge() {
        let admin = profile(UserType::Admin, 0);
        let m = mission(Uuid::new_v4());
        let mission_id = m.id;

        let mut missions = MockMissionRepositoryTrait::new();
        missions.expect_get_mission().returning(move |_| Ok(Some(m.clone())));
        let mut crm = MockCrmRepositoryTrait::new();
        crm.expect_unlock().never();
        crm.expect_list_approved_participants().returning(|_| Ok(vec![]));

        let service = CrmService::new(Arc::new(missions), Arc::new(crm), 50);
        let data = service.unlock(&admin, mission_id).await.unwrap();
        assert!(!data.charged);
        assert_eq!(data.total_participants, 0);
    }
}
