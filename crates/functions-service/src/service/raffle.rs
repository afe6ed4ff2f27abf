//! 抽奖服务
//!
//! 状态机：draft -> active -> drawn，draft | active -> cancelled。
//! 开奖使用 32 字节随机种子，存储 `sha256(seed ‖ raffle_id ‖ entry_count)`
//! 作为承诺值，响应中返回种子以便复核。

use std::sync::Arc;

use premiads_shared::observability::metrics;
use rand::Rng;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::require_admin;
use crate::dto::{
    BuyEntriesRequest, BuyEntriesResponse, CreateRaffleRequest, DrawResponse,
    RaffleEntriesResponse,
};
use crate::error::{ApiError, Result};
use crate::models::{AuditEntry, DrawSeed, NewRaffle, Profile, Raffle, RaffleStatus};
use crate::repository::{DrawPlan, EntryPurchasePlan, RaffleRepositoryTrait};

pub use crate::models::{commitment_hash, pick_winner};

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub struct RaffleService {
    raffles: Arc<dyn RaffleRepositoryTrait>,
    max_entries_per_purchase: i32,
}

impl RaffleService {
    pub fn new(raffles: Arc<dyn RaffleRepositoryTrait>, max_entries_per_purchase: i32) -> Self {
        Self {
            raffles,
            max_entries_per_purchase,
        }
    }

    #[instrument(skip(self, caller, request), fields(caller_id = %caller.id))]
    pub async fn create(&self, caller: &Profile, request: CreateRaffleRequest) -> Result<Raffle> {
        require_admin(caller)?;
        request.validate()?;

        let raffle = NewRaffle {
            title: request.title.trim().to_string(),
            description: request.description,
            prize: request.prize,
            entry_cost: request.entry_cost,
            max_entries: request.max_entries,
            draw_date: request.draw_date,
            created_by: caller.id,
        };
        let audit = AuditEntry::new(caller.id, "raffle.created", "raffle", None).with_details(
            serde_json::json!({ "title": raffle.title, "entryCost": raffle.entry_cost }),
        );

        let created = self.raffles.create(&raffle, &audit).await?;
        info!(raffle_id = %created.id, "raffle created");
        Ok(created)
    }

    pub async fn activate(&self, caller: &Profile, raffle_id: Uuid) -> Result<Raffle> {
        self.transition(caller, raffle_id, RaffleStatus::Active, "raffle.activated")
            .await
    }

    pub async fn cancel(&self, caller: &Profile, raffle_id: Uuid) -> Result<Raffle> {
        self.transition(caller, raffle_id, RaffleStatus::Cancelled, "raffle.cancelled")
            .await
    }

    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    async fn transition(
        &self,
        caller: &Profile,
        raffle_id: Uuid,
        to: RaffleStatus,
        action: &'static str,
    ) -> Result<Raffle> {
        require_admin(caller)?;

        let raffle = self.load(raffle_id).await?;
        if !raffle.status.can_transition_to(to) {
            return Err(ApiError::invalid_transition(raffle.status, to));
        }

        let audit = AuditEntry::new(caller.id, action, "raffle", Some(raffle_id)).with_details(
            serde_json::json!({ "from": raffle.status, "to": to }),
        );

        let updated = self
            .raffles
            .transition(raffle_id, raffle.status, to, &audit)
            .await?
            .ok_or_else(|| ApiError::invalid_transition(raffle.status, to))?;

        info!(%raffle_id, status = %updated.status, "raffle status changed");
        Ok(updated)
    }

    /// 用 rifas 购买抽奖券，余额与容量在仓储事务内重新校验
    #[instrument(skip(self, caller, request), fields(caller_id = %caller.id, raffle_id = %request.raffle_id))]
    pub async fn buy_entries(
        &self,
        caller: &Profile,
        request: BuyEntriesRequest,
    ) -> Result<BuyEntriesResponse> {
        request.validate()?;
        if request.quantity > self.max_entries_per_purchase {
            return Err(ApiError::Validation(format!(
                "quantity must not exceed {}",
                self.max_entries_per_purchase
            )));
        }

        let raffle = self.load(request.raffle_id).await?;
        if raffle.status != RaffleStatus::Active {
            return Err(ApiError::NotEligible(format!(
                "raffle is {}, entries can only be bought while active",
                raffle.status
            )));
        }

        let cost = raffle.total_cost(request.quantity).ok_or_else(|| {
            ApiError::Validation("total entry cost exceeds the supported range".to_string())
        })?;
        if !caller.can_afford(cost) {
            return Err(ApiError::InsufficientRifas {
                required: cost,
                available: caller.rifas,
            });
        }

        let outcome = self
            .raffles
            .buy_entries(&EntryPurchasePlan {
                raffle_id: raffle.id,
                user_id: caller.id,
                quantity: request.quantity,
            })
            .await?;

        metrics::record_raffle_entries_sold(outcome.ticket_numbers.len() as u64);
        metrics::record_rifas_debited("raffle_entry", outcome.total_cost);
        info!(
            quantity = request.quantity,
            total_cost = outcome.total_cost,
            "raffle entries bought"
        );

        Ok(BuyEntriesResponse {
            raffle_id: raffle.id,
            ticket_numbers: outcome.ticket_numbers,
            total_cost: outcome.total_cost,
            rifas_balance: outcome.rifas_balance,
        })
    }

    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn draw(&self, caller: &Profile, raffle_id: Uuid) -> Result<DrawResponse> {
        require_admin(caller)?;

        let raffle = self.load(raffle_id).await?;
        if raffle.status != RaffleStatus::Active {
            return Err(ApiError::invalid_transition(raffle.status, RaffleStatus::Drawn));
        }

        let mut seed: DrawSeed = [0u8; 32];
        rand::rng().fill(&mut seed);

        // 中奖者在仓储事务内基于最终券集合计算
        let drawn = self
            .raffles
            .draw(&DrawPlan {
                raffle_id,
                seed,
                drawn_by: caller.id,
            })
            .await?;
        let outcome = drawn.outcome;

        metrics::record_raffle_draw();
        info!(
            %raffle_id,
            winner_id = %outcome.winner_id,
            winning_number = outcome.winning_number,
            total_entries = outcome.total_entries,
            "raffle drawn"
        );

        Ok(DrawResponse {
            raffle: drawn.raffle,
            winner_id: outcome.winner_id,
            winning_number: outcome.winning_number,
            total_entries: outcome.total_entries,
            seed: hex(&seed),
            seed_hash: outcome.seed_hash,
        })
    }

    /// 管理员查看全部券，其他用户只能看到自己的券
    pub async fn entries(&self, caller: &Profile, raffle_id: Uuid) -> Result<RaffleEntriesResponse> {
        self.load(raffle_id).await?;

        let owner = if caller.is_admin() { None } else { Some(caller.id) };
        let entries = self.raffles.list_entries(raffle_id, owner).await?;

        Ok(RaffleEntriesResponse {
            raffle_id,
            total: entries.len(),
            entries,
        })
    }

    async fn load(&self, raffle_id: Uuid) -> Result<Raffle> {
        self.raffles
            .get(raffle_id)
            .await?
            .ok_or(ApiError::RaffleNotFound(raffle_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::{DrawOutcome, NotificationKind, RaffleEntry, UserType};
    use crate::repository::{DrawResult, EntryPurchaseOutcome, MockRaffleRepositoryTrait};
    use crate::service::test_support::profile;

    fn raffle(status: RaffleStatus) -> Raffle {
        Raffle {
            id: Uuid::new_v4(),
            title: "Sorteio de Natal".to_string(),
            description: None,
            prize: "Smartphone".to_string(),
            entry_cost: 10,
            max_entries: Some(1_000),
            status,
            draw_date: None,
            winner_id: None,
            winning_number: None,
            draw_seed_hash: None,
            drawn_at: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn entries(raffle_id: Uuid, count: i32) -> Vec<RaffleEntry> {
        (1..=count)
            .map(|ticket_number| RaffleEntry {
                id: Uuid::new_v4(),
                raffle_id,
                user_id: Uuid::new_v4(),
                ticket_number,
                created_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_hex_encoding() {
        assert_eq!(hex(&[0x00, 0x0f, 0xab]), "000fab");
    }

    #[tokio::test]
    async fn test_activate_draft() {
        let admin = profile(UserType::Admin, 0);
        let draft = raffle(RaffleStatus::Draft);
        let raffle_id = draft.id;

        let mut repo = MockRaffleRepositoryTrait::new();
        repo.expect_get().returning(move |_| Ok(Some(draft.clone())));
        repo.expect_transition()
            .withf(|_, from, to, audit| {
                *from == RaffleStatus::Draft
                    && *to == RaffleStatus::Active
                    && audit.action == "raffle.activated"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(Some(raffle(RaffleStatus::Active))));

        let updated = RaffleService::new(Arc::new(repo), 100)
            .activate(&admin, raffle_id)
            .await
            .unwrap();
        assert_eq!(updated.status, RaffleStatus::Active);
    }

    #[tokio::test]
    async fn test_cancel_drawn_rejected() {
        let admin = profile(UserType::Admin, 0);
        let drawn = raffle(RaffleStatus::Drawn);

        let mut repo = MockRaffleRepositoryTrait::new();
        repo.expect_get().returning(move |_| Ok(Some(drawn.clone())));
        repo.expect_transition().never();

        let err = RaffleService::new(Arc::new(repo), 100)
            .cancel(&admin, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_buy_entries_insufficient_rifas() {
        let buyer = profile(UserType::Participante, 15);
        let active = raffle(RaffleStatus::Active);
        let raffle_id = active.id;

        let mut repo = MockRaffleRepositoryTrait::new();
        repo.expect_get().returning(move |_| Ok(Some(active.clone())));
        repo.expect_buy_entries().never();

        let err = RaffleService::new(Arc::new(repo), 100)
            .buy_entries(&buyer, BuyEntriesRequest { raffle_id, quantity: 2 })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::InsufficientRifas { required: 20, available: 15 }
        ));
    }

    #[tokio::test]
    async fn test_buy_entries_on_draft_not_eligible() {
        let buyer = profile(UserType::Participante, 500);
        let draft = raffle(RaffleStatus::Draft);

        let mut repo = MockRaffleRepositoryTrait::new();
        repo.expect_get().returning(move |_| Ok(Some(draft.clone())));

        let err = RaffleService::new(Arc::new(repo), 100)
            .buy_entries(
                &buyer,
                BuyEntriesRequest {
                    raffle_id: Uuid::new_v4(),
                    quantity: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotEligible(_)));
    }

    #[tokio::test]
    async fn test_buy_entries_respects_purchase_cap() {
        let buyer = profile(UserType::Participante, 10_000);
        let mut repo = MockRaffleRepositoryTrait::new();
        repo.expect_get().never();

        let err = RaffleService::new(Arc::new(repo), 5)
            .buy_entries(
                &buyer,
                BuyEntriesRequest {
                    raffle_id: Uuid::new_v4(),
                    quantity: 6,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_buy_entries_success() {
        let buyer = profile(UserType::Participante, 100);
        let buyer_id = buyer.id;
        let active = raffle(RaffleStatus::Active);
        let raffle_id = active.id;

        let mut repo = MockRaffleRepositoryTrait::new();
        repo.expect_get().returning(move |_| Ok(Some(active.clone())));
        repo.expect_buy_entries()
            .withf(move |plan| plan.user_id == buyer_id && plan.quantity == 3)
            .times(1)
            .returning(|_| {
                Ok(EntryPurchaseOutcome {
                    ticket_numbers: vec![8, 9, 10],
                    total_cost: 30,
                    rifas_balance: 70,
                })
            });

        let response = RaffleService::new(Arc::new(repo), 100)
            .buy_entries(&buyer, BuyEntriesRequest { raffle_id, quantity: 3 })
            .await
            .unwrap();
        assert_eq!(response.ticket_numbers, vec![8, 9, 10]);
        assert_eq!(response.rifas_balance, 70);
    }

    #[tokio::test]
    async fn test_buy_entries_cost_overflow_rejected() {
        let buyer = profile(UserType::Participante, 0);
        let mut active = raffle(RaffleStatus::Active);
        active.entry_cost = 1 << 62;
        let raffle_id = active.id;

        let mut repo = MockRaffleRepositoryTrait::new();
        repo.expect_get().returning(move |_| Ok(Some(active.clone())));
        repo.expect_buy_entries().never();

        let err = RaffleService::new(Arc::new(repo), 100)
            .buy_entries(&buyer, BuyEntriesRequest { raffle_id, quantity: 3 })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_draw_on_draft_rejected() {
        let admin = profile(UserType::Admin, 0);
        let draft = raffle(RaffleStatus::Draft);

        let mut repo = MockRaffleRepositoryTrait::new();
        repo.expect_get().returning(move |_| Ok(Some(draft.clone())));
        repo.expect_draw().never();

        let err = RaffleService::new(Arc::new(repo), 100)
            .draw(&admin, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_draw_requires_admin() {
        let advertiser = profile(UserType::Anunciante, 0);
        let mut repo = MockRaffleRepositoryTrait::new();
        repo.expect_get().never();
        repo.expect_draw().never();

        let err = RaffleService::new(Arc::new(repo), 100)
            .draw(&advertiser, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_draw_returns_seed_behind_commitment() {
        let admin = profile(UserType::Admin, 0);
        let admin_id = admin.id;
        let active = raffle(RaffleStatus::Active);
        let raffle_id = active.id;
        let pool = entries(raffle_id, 5);
        let pool_for_draw = pool.clone();

        let mut repo = MockRaffleRepositoryTrait::new();
        repo.expect_get().returning(move |_| Ok(Some(active.clone())));
        repo.expect_draw()
            .withf(move |plan| plan.raffle_id == raffle_id && plan.drawn_by == admin_id)
            .times(1)
            .returning(move |plan| {
                let outcome =
                    DrawOutcome::compute(plan.raffle_id, &pool_for_draw, &plan.seed).unwrap();
                assert_eq!(
                    outcome.winner_notification(&raffle(RaffleStatus::Active)).kind,
                    NotificationKind::RaffleWin
                );
                Ok(DrawResult {
                    raffle: raffle(RaffleStatus::Drawn),
                    outcome,
                })
            });

        let response = RaffleService::new(Arc::new(repo), 100)
            .draw(&admin, raffle_id)
            .await
            .unwrap();

        let seed_bytes: Vec<u8> = (0..response.seed.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&response.seed[i..i + 2], 16).unwrap())
            .collect();
        let seed: DrawSeed = seed_bytes.try_into().unwrap();

        assert_eq!(response.seed_hash, commitment_hash(&seed, raffle_id, 5));
        let expected = pick_winner(&pool, &seed).unwrap();
        assert_eq!(response.winning_number, expected.ticket_number);
        assert_eq!(response.winner_id, expected.user_id);
        assert_eq!(response.total_entries, 5);
        assert_eq!(response.raffle.status, RaffleStatus::Drawn);
    }

    #[tokio::test]
    async fn test_concurrent_draw_already_processed() {
        let admin = profile(UserType::Admin, 0);
        let active = raffle(RaffleStatus::Active);
        let raffle_id = active.id;

        let mut repo = MockRaffleRepositoryTrait::new();
        repo.expect_get().returning(move |_| Ok(Some(active.clone())));
        repo.expect_draw().returning(|plan| {
            Err(ApiError::AlreadyProcessed(format!(
                "raffle {} has already been drawn",
                plan.raffle_id
            )))
        });

        let err = RaffleService::new(Arc::new(repo), 100)
            .draw(&admin, raffle_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AlreadyProcessed(_)));
    }

    #[tokio::test]
    async fn test_participant_sees_only_own_entries() {
        let participant = profile(UserType::Participante, 0);
        let participant_id = participant.id;
        let active = raffle(RaffleStatus::Active);

        let mut repo = MockRaffleRepositoryTrait::new();
        repo.expect_get().returning(move |_| Ok(Some(active.clone())));
        repo.expect_list_entries()
            .withf(move |_, owner| *owner == Some(participant_id))
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let response = RaffleService::new(Arc::new(repo), 100)
            .entries(&participant, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(response.total, 0);
    }
}
