//! 任务提交审核服务
//!
//! ## 审核流程
//!
//! 1. 加载提交与任务 -> 2. 鉴权（管理员或任务所属广告主）-> 3. 状态检查
//!    -> 4. 事务写入（奖励、流水、完成数、通知、审计）-> 5. 推荐奖励（尽力而为）

use std::sync::Arc;

use premiads_shared::observability::metrics;
use serde_json::json;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::referral::ReferralService;
use crate::dto::{ApproveSubmissionRequest, SubmissionReviewResponse};
use crate::error::{ApiError, Result};
use crate::models::{
    AuditEntry, Mission, NewNotification, NotificationKind, Profile, Submission, UserType,
};
use crate::repository::{ApprovalPlan, MissionRepositoryTrait, RejectionPlan};

pub struct ApprovalService {
    missions: Arc<dyn MissionRepositoryTrait>,
    referrals: Arc<ReferralService>,
}

impl ApprovalService {
    pub fn new(missions: Arc<dyn MissionRepositoryTrait>, referrals: Arc<ReferralService>) -> Self {
        Self {
            missions,
            referrals,
        }
    }

    #[instrument(
        skip(self, reviewer, request),
        fields(reviewer_id = %reviewer.id, submission_id = %request.submission_id, approved = request.approved)
    )]
    pub async fn review(
        &self,
        reviewer: &Profile,
        request: ApproveSubmissionRequest,
    ) -> Result<SubmissionReviewResponse> {
        request.validate()?;

        let submission = self
            .missions
            .get_submission(request.submission_id)
            .await?
            .ok_or(ApiError::SubmissionNotFound(request.submission_id))?;

        let mission = self
            .missions
            .get_mission(submission.mission_id)
            .await?
            .ok_or(ApiError::MissionNotFound(submission.mission_id))?;

        Self::authorize(reviewer, &mission)?;

        // 事务内会在行锁下再次检查，这里提前失败
        if !submission.is_pending() {
            return Err(ApiError::AlreadyProcessed(format!(
                "submission {} is already {}",
                submission.id,
                submission.status.as_str()
            )));
        }

        let feedback = request
            .feedback
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());

        if request.approved {
            self.approve(reviewer, &submission, &mission, feedback).await
        } else {
            let feedback = feedback.ok_or_else(|| {
                ApiError::Validation("feedback is required when rejecting a submission".to_string())
            })?;
            self.reject(reviewer, &submission, &mission, feedback).await
        }
    }

    fn authorize(reviewer: &Profile, mission: &Mission) -> Result<()> {
        match reviewer.user_type {
            UserType::Admin => Ok(()),
            UserType::Anunciante if mission.is_owned_by(reviewer.id) => Ok(()),
            UserType::Anunciante => Err(ApiError::Forbidden(
                "only the mission owner can review its submissions".to_string(),
            )),
            UserType::Participante => Err(ApiError::Forbidden(
                "participants cannot review submissions".to_string(),
            )),
        }
    }

    async fn approve(
        &self,
        reviewer: &Profile,
        submission: &Submission,
        mission: &Mission,
        feedback: Option<String>,
    ) -> Result<SubmissionReviewResponse> {
        let rifas = mission.rifas_reward;
        let cashback_cents = mission.cashback_reward_cents;

        let plan = ApprovalPlan {
            submission_id: submission.id,
            mission_id: mission.id,
            participant_id: submission.user_id,
            reviewer_id: reviewer.id,
            feedback: feedback.clone(),
            rifas,
            cashback_cents,
            notification: NewNotification::new(
                submission.user_id,
                NotificationKind::MissionApproved,
                "Missão aprovada!",
                format!(
                    "Sua participação em \"{}\" foi aprovada. Você ganhou {} rifas.",
                    mission.title, rifas
                ),
            )
            .with_metadata(json!({
                "missionId": mission.id,
                "submissionId": submission.id,
                "rifas": rifas,
                "cashbackCents": cashback_cents,
            })),
            audit: AuditEntry::new(
                reviewer.id,
                "submission.approved",
                "mission_submission",
                Some(submission.id),
            )
            .with_details(json!({
                "missionId": mission.id,
                "participantId": submission.user_id,
                "rifas": rifas,
                "cashbackCents": cashback_cents,
                "feedback": feedback,
            })),
        };

        let record = self.missions.approve_submission(&plan).await?;

        metrics::record_submission_moderation("approved");
        metrics::record_rifas_credited("mission_reward", rifas);
        metrics::record_cashback_credited(cashback_cents);

        info!(
            participant_id = %submission.user_id,
            rifas,
            cashback_cents,
            mission_closed = record.mission_closed,
            "submission approved"
        );

        // 推荐奖励不影响审核结果，失败时保持 pending 以便稍后手动完成
        let referral_completed = match self
            .referrals
            .complete_after_approval(reviewer.id, submission.user_id)
            .await
        {
            Ok(completed) => completed,
            Err(e) => {
                warn!(
                    participant_id = %submission.user_id,
                    error = %e,
                    "referral completion after approval failed"
                );
                false
            }
        };

        Ok(SubmissionReviewResponse {
            submission: record.submission,
            rifas_credited: rifas,
            cashback_cents,
            rifas_balance: Some(record.rifas_balance),
            mission_closed: record.mission_closed,
            referral_completed,
        })
    }

    async fn reject(
        &self,
        reviewer: &Profile,
        submission: &Submission,
        mission: &Mission,
        feedback: String,
    ) -> Result<SubmissionReviewResponse> {
        let plan = RejectionPlan {
            submission_id: submission.id,
            reviewer_id: reviewer.id,
            feedback: feedback.clone(),
            notification: NewNotification::new(
                submission.user_id,
                NotificationKind::MissionRejected,
                "Missão não aprovada",
                format!(
                    "Sua participação em \"{}\" não foi aprovada: {}",
                    mission.title, feedback
                ),
            )
            .with_metadata(json!({
                "missionId": mission.id,
                "submissionId": submission.id,
            })),
            audit: AuditEntry::new(
                reviewer.id,
                "submission.rejected",
                "mission_submission",
                Some(submission.id),
            )
            .with_details(json!({
                "missionId": mission.id,
                "participantId": submission.user_id,
                "feedback": feedback,
            })),
        };

        let submission = self.missions.reject_submission(&plan).await?;
        metrics::record_submission_moderation("rejected");
        info!(participant_id = %submission.user_id, "submission rejected");

        Ok(SubmissionReviewResponse {
            submission,
            rifas_credited: 0,
            cashback_cents: 0,
            rifas_balance: None,
            mission_closed: false,
            referral_completed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::{MissionStatus, Referral, ReferralStatus, SubmissionStatus};
    use crate::repository::{
        ApprovalRecord, MockMissionRepositoryTrait, MockReferralRepositoryTrait,
    };
    use crate::service::test_support::profile;

    fn mission(advertiser_id: Uuid) -> Mission {
        Mission {
            id: Uuid::new_v4(),
            advertiser_id,
            title: "Poste uma foto com o produto".to_string(),
            description: None,
            status: MissionStatus::Ativa,
            rifas_reward: 25,
            cashback_reward_cents: 500,
            max_participants: Some(100),
            completions: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn submission(mission_id: Uuid, status: SubmissionStatus) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            mission_id,
            user_id: Uuid::new_v4(),
            status,
            submission_data: json!({ "url": "https://example.com/post/1" }),
            feedback: None,
            validated_by: None,
            validated_at: None,
            created_at: Utc::now(),
        }
    }

    fn request(submission_id: Uuid, approved: bool, feedback: Option<&str>) -> ApproveSubmissionRequest {
        ApproveSubmissionRequest {
            submission_id,
            approved,
            feedback: feedback.map(str::to_string),
        }
    }

    /// 构造服务：missions 用于审核，referral 仅返回"无推荐"
    fn service_with(missions: MockMissionRepositoryTrait, referrals: MockReferralRepositoryTrait) -> ApprovalService {
        let missions: Arc<dyn MissionRepositoryTrait> = Arc::new(missions);
        let referral_service = ReferralService::new(
            Arc::new(referrals),
            missions.clone(),
            20,
            10,
        );
        ApprovalService::new(missions, Arc::new(referral_service))
    }

    fn no_referral() -> MockReferralRepositoryTrait {
        let mut referrals = MockReferralRepositoryTrait::new();
        referrals.expect_find_by_referred().returning(|_| Ok(None));
        referrals
    }

    fn expect_lookup(missions: &mut MockMissionRepositoryTrait, sub: Submission, m: Mission) {
        missions
            .expect_get_submission()
            .returning(move |_| Ok(Some(sub.clone())));
        missions
            .expect_get_mission()
            .returning(move |_| Ok(Some(m.clone())));
    }

    #[tokio::test]
    async fn test_owner_approval_credits_mission_reward() {
        let advertiser = profile(UserType::Anunciante, 0);
        let m = mission(advertiser.id);
        let sub = submission(m.id, SubmissionStatus::Pending);
        let sub_id = sub.id;
        let participant_id = sub.user_id;

        let mut missions = MockMissionRepositoryTrait::new();
        expect_lookup(&mut missions, sub.clone(), m.clone());
        missions
            .expect_approve_submission()
            .withf(move |plan| {
                plan.submission_id == sub_id
                    && plan.participant_id == participant_id
                    && plan.rifas == 25
                    && plan.cashback_cents == 500
                    && plan.notification.user_id == participant_id
                    && plan.audit.action == "submission.approved"
            })
            .times(1)
            .returning(move |_| {
                let mut approved = sub.clone();
                approved.status = SubmissionStatus::Approved;
                Ok(ApprovalRecord {
                    submission: approved,
                    rifas_balance: 125,
                    cashback_balance_cents: 500,
                    mission_closed: false,
                })
            });

        let response = service_with(missions, no_referral())
            .review(&advertiser, request(sub_id, true, None))
            .await
            .unwrap();

        assert_eq!(response.submission.status, SubmissionStatus::Approved);
        assert_eq!(response.rifas_credited, 25);
        assert_eq!(response.cashback_cents, 500);
        assert_eq!(response.rifas_balance, Some(125));
        assert!(!response.referral_completed);
    }

    #[tokio::test]
    async fn test_non_pending_submission_rejected_without_writes() {
        let admin = profile(UserType::Admin, 0);
        let m = mission(Uuid::new_v4());
        let sub = submission(m.id, SubmissionStatus::Approved);
        let sub_id = sub.id;

        let mut missions = MockMissionRepositoryTrait::new();
        expect_lookup(&mut missions, sub, m);
        missions.expect_approve_submission().never();

        let err = service_with(missions, MockReferralRepositoryTrait::new())
            .review(&admin, request(sub_id, true, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AlreadyProcessed(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_other_advertiser_forbidden() {
        let other = profile(UserType::Anunciante, 0);
        let m = mission(Uuid::new_v4());
        let sub = submission(m.id, SubmissionStatus::Pending);
        let sub_id = sub.id;

        let mut missions = MockMissionRepositoryTrait::new();
        expect_lookup(&mut missions, sub, m);
        missions.expect_approve_submission().never();

        let err = service_with(missions, MockReferralRepositoryTrait::new())
            .review(&other, request(sub_id, true, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_participant_forbidden() {
        let participant = profile(UserType::Participante, 0);
        let m = mission(Uuid::new_v4());
        let sub = submission(m.id, SubmissionStatus::Pending);
        let sub_id = sub.id;

        let mut missions = MockMissionRepositoryTrait::new();
        expect_lookup(&mut missions, sub, m);

        let err = service_with(missions, MockReferralRepositoryTrait::new())
            .review(&participant, request(sub_id, true, None))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_submission_not_found() {
        let admin = profile(UserType::Admin, 0);
        let mut missions = MockMissionRepositoryTrait::new();
        missions.expect_get_submission().returning(|_| Ok(None));

        let err = service_with(missions, MockReferralRepositoryTrait::new())
            .review(&admin, request(Uuid::new_v4(), true, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::SubmissionNotFound(_)));
    }

    #[tokio::test]
    async fn test_rejection_requires_feedback() {
        let admin = profile(UserType::Admin, 0);
        let m = mission(Uuid::new_v4());
        let sub = submission(m.id, SubmissionStatus::Pending);
        let sub_id = sub.id;

        let mut missions = MockMissionRepositoryTrait::new();
        expect_lookup(&mut missions, sub, m);
        missions.expect_reject_submission().never();

        let err = service_with(missions, MockReferralRepositoryTrait::new())
            .review(&admin, request(sub_id, false, Some("   ")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rejection_with_feedback() {
        let admin = profile(UserType::Admin, 0);
        let m = mission(Uuid::new_v4());
        let sub = submission(m.id, SubmissionStatus::Pending);
        let sub_id = sub.id;

        let mut missions = MockMissionRepositoryTrait::new();
        expect_lookup(&mut missions, sub.clone(), m);
        missions
            .expect_reject_submission()
            .withf(|plan| plan.feedback == "foto ilegível")
            .times(1)
            .returning(move |plan| {
                let mut rejected = sub.clone();
                rejected.status = SubmissionStatus::Rejected;
                rejected.feedback = Some(plan.feedback.clone());
                Ok(rejected)
            });

        let response = service_with(missions, MockReferralRepositoryTrait::new())
            .review(&admin, request(sub_id, false, Some(" foto ilegível ")))
            .await
            .unwrap();
        assert_eq!(response.submission.status, SubmissionStatus::Rejected);
        assert_eq!(response.rifas_credited, 0);
        assert!(response.rifas_balance.is_none());
    }

    #[tokio::test]
    async fn test_referral_failure_does_not_fail_approval() {
        let admin = profile(UserType::Admin, 0);
        let m = mission(Uuid::new_v4());
        let sub = submission(m.id, SubmissionStatus::Pending);
        let sub_id = sub.id;

        let mut missions = MockMissionRepositoryTrait::new();
        expect_lookup(&mut missions, sub.clone(), m);
        missions.expect_approve_submission().returning(move |_| {
            Ok(ApprovalRecord {
                submission: sub.clone(),
                rifas_balance: 25,
                cashback_balance_cents: 500,
                mission_closed: true,
            })
        });
        missions.expect_count_approved_submissions().returning(|_| Ok(1));

        let mut referrals = MockReferralRepositoryTrait::new();
        referrals.expect_find_by_referred().returning(|id| {
            Ok(Some(Referral {
                id: Uuid::new_v4(),
                referrer_id: Uuid::new_v4(),
                referred_id: id,
                code: "QWERTY12".to_string(),
                status: ReferralStatus::Pending,
                reward_rifas: 0,
                completed_at: None,
                created_at: Utc::now(),
            }))
        });
        referrals
            .expect_complete()
            .returning(|_| Err(ApiError::Database(sqlx::Error::PoolTimedOut)));

        let response = service_with(missions, referrals)
            .review(&admin, request(sub_id, true, None))
            .await
            .unwrap();
        assert!(response.mission_closed);
        assert!(!response.referral_completed);
    }
}
