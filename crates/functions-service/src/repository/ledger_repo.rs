//! rifa 账本仓储
//!
//! 每一次余额变动都追加一条带符号的流水，金额符号由流水类型决定

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::Result;
use crate::models::LedgerKind;

pub struct LedgerRepository;

impl LedgerRepository {
    /// 在事务中追加账本流水
    ///
    /// `amount` 传入正数，写入时按 `kind` 的符号转换
    pub async fn append_in_tx(
        conn: &mut PgConnection,
        user_id: Uuid,
        kind: LedgerKind,
        amount: i64,
        reference_id: Option<Uuid>,
        description: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rifa_transactions (user_id, amount, kind, reference_id, description)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(kind.sign() * amount.abs())
        .bind(kind)
        .bind(reference_id)
        .bind(description)
        .execute(conn)
        .await?;

        Ok(())
    }
}
