//! 抽奖实体

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::audit::AuditEntry;
use super::enums::{NotificationKind, RaffleStatus};
use super::notification::NewNotification;

pub type DrawSeed = [u8; 32];

/// 计算开奖承诺值：种子、抽奖 ID 原始字节、参与券数（大端 u64）拼接后的 sha256
pub fn commitment_hash(seed: &DrawSeed, raffle_id: Uuid, entry_count: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update(raffle_id.as_bytes());
    hasher.update(entry_count.to_be_bytes());
    format!("{:x}", hasher.finalize())
}

/// 由种子确定性地均匀选出一张券
pub fn pick_winner<'a>(entries: &'a [RaffleEntry], seed: &DrawSeed) -> Option<&'a RaffleEntry> {
    if entries.is_empty() {
        return None;
    }
    let mut rng = StdRng::from_seed(*seed);
    entries.get(rng.random_range(0..entries.len()))
}

/// 抽奖活动
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Raffle {
    pub id: Uuid,
    pub title: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub prize: String,
    /// 每张抽奖券消耗的 rifa
    pub entry_cost: i64,
    /// 抽奖券总量上限（null 表示不限）
    #[sqlx(default)]
    pub max_entries: Option<i32>,
    pub status: RaffleStatus,
    #[sqlx(default)]
    pub draw_date: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub winner_id: Option<Uuid>,
    #[sqlx(default)]
    pub winning_number: Option<i32>,
    /// 开奖种子承诺值 sha256(seed ‖ raffle_id ‖ entry_count)
    #[sqlx(default)]
    pub draw_seed_hash: Option<String>,
    #[sqlx(default)]
    pub drawn_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Raffle {
    /// 剩余可售券数，None 表示不限
    pub fn remaining_capacity(&self, sold: i64) -> Option<i64> {
        self.max_entries
            .map(|max| (i64::from(max) - sold).max(0))
    }

    /// 购买 quantity 张券的总价，溢出时返回 None
    pub fn total_cost(&self, quantity: i32) -> Option<i64> {
        self.entry_cost.checked_mul(i64::from(quantity))
    }
}

/// 新建抽奖参数
#[derive(Debug, Clone)]
pub struct NewRaffle {
    pub title: String,
    pub description: Option<String>,
    pub prize: String,
    pub entry_cost: i64,
    pub max_entries: Option<i32>,
    pub draw_date: Option<DateTime<Utc>>,
    pub created_by: Uuid,
}

/// 抽奖券
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RaffleEntry {
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub user_id: Uuid,
    pub ticket_number: i32,
    pub created_at: DateTime<Utc>,
}

/// 开奖结果
#[derive(Debug, Clone, PartialEq)]
pub struct DrawOutcome {
    pub winner_id: Uuid,
    pub winning_number: i32,
    pub seed_hash: String,
    pub total_entries: usize,
}

impl DrawOutcome {
    /// entries 需按券号排序，空列表返回 None
    pub fn compute(raffle_id: Uuid, entries: &[RaffleEntry], seed: &DrawSeed) -> Option<Self> {
        pick_winner(entries, seed).map(|winner| Self {
            winner_id: winner.user_id,
            winning_number: winner.ticket_number,
            seed_hash: commitment_hash(seed, raffle_id, entries.len() as u64),
            total_entries: entries.len(),
        })
    }

    pub fn winner_notification(&self, raffle: &Raffle) -> NewNotification {
        NewNotification::new(
            self.winner_id,
            NotificationKind::RaffleWin,
            "Você ganhou o sorteio!",
            format!(
                "Parabéns! O bilhete {} foi sorteado em \"{}\". Prêmio: {}.",
                self.winning_number, raffle.title, raffle.prize
            ),
        )
        .with_metadata(serde_json::json!({
            "raffleId": raffle.id,
            "winningNumber": self.winning_number,
        }))
    }

    pub fn audit(&self, raffle_id: Uuid, drawn_by: Uuid) -> AuditEntry {
        AuditEntry::new(drawn_by, "raffle.drawn", "raffle", Some(raffle_id)).with_details(
            serde_json::json!({
                "winnerId": self.winner_id,
                "winningNumber": self.winning_number,
                "totalEntries": self.total_entries,
                "seedHash": self.seed_hash,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raffle(entry_cost: i64) -> Raffle {
        Raffle {
            id: Uuid::new_v4(),
            title: "Sorteio de Natal".to_string(),
            description: None,
            prize: "Smartphone".to_string(),
            entry_cost,
            max_entries: Some(10),
            status: RaffleStatus::Active,
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
    fn test_total_cost_overflow() {
        assert_eq!(raffle(10).total_cost(3), Some(30));
        assert_eq!(raffle(1 << 62).total_cost(3), None);
        assert_eq!(raffle(i64::MAX).total_cost(1), Some(i64::MAX));
    }

    #[test]
    fn test_remaining_capacity() {
        let limited = raffle(10);
        assert_eq!(limited.remaining_capacity(4), Some(6));
        assert_eq!(limited.remaining_capacity(15), Some(0));

        let unlimited = Raffle {
            max_entries: None,
            ..raffle(10)
        };
        assert_eq!(unlimited.remaining_capacity(1_000), None);
    }

    #[test]
    fn test_pick_winner_deterministic() {
        let pool = entries(Uuid::new_v4(), 50);
        let seed = [7u8; 32];

        let first = pick_winner(&pool, &seed).unwrap();
        let second = pick_winner(&pool, &seed).unwrap();
        assert_eq!(first.ticket_number, second.ticket_number);
        assert_eq!(first.user_id, second.user_id);

        assert!(pick_winner(&[], &seed).is_none());
    }

    #[test]
    fn test_pick_winner_spreads_over_entries() {
        let pool = entries(Uuid::new_v4(), 4);
        let mut hits = [0u32; 4];
        for i in 0..200u8 {
            let mut seed = [0u8; 32];
            seed[0] = i;
            let winner = pick_winner(&pool, &seed).unwrap();
            hits[(winner.ticket_number - 1) as usize] += 1;
        }
        assert!(hits.iter().all(|&h| h > 0));
    }

    #[test]
    fn test_commitment_hash_matches_manual_digest() {
        let seed = [42u8; 32];
        let raffle_id = Uuid::new_v4();

        let mut data = Vec::new();
        data.extend_from_slice(&seed);
        data.extend_from_slice(raffle_id.as_bytes());
        data.extend_from_slice(&3u64.to_be_bytes());
        let expected = format!("{:x}", Sha256::digest(&data));

        let hash = commitment_hash(&seed, raffle_id, 3);
        assert_eq!(hash, expected);
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, commitment_hash(&seed, raffle_id, 4));
    }

    #[test]
    fn test_outcome_commits_to_entry_count() {
        let target = raffle(10);
        let pool = entries(target.id, 5);
        let seed = [3u8; 32];

        let outcome = DrawOutcome::compute(target.id, &pool, &seed).unwrap();
        assert_eq!(outcome.total_entries, 5);
        assert_eq!(outcome.seed_hash, commitment_hash(&seed, target.id, 5));
        assert_eq!(
            outcome.winning_number,
            pick_winner(&pool, &seed).unwrap().ticket_number
        );
        assert!(DrawOutcome::compute(target.id, &[], &seed).is_none());

        let notification = outcome.winner_notification(&target);
        assert_eq!(notification.user_id, outcome.winner_id);
        assert_eq!(notification.kind, NotificationKind::RaffleWin);
        assert!(notification.message.contains("Smartphone"));

        let audit = outcome.audit(target.id, target.created_by);
        assert_eq!(audit.action, "raffle.drawn");
        assert_eq!(audit.target_id, Some(target.id));
    }
}
