//! 业务服务层
//!
//! 每个服务对应一个函数端点，负责鉴权、校验与派生数值计算，
//! 写入由仓储层在单个事务内完成

mod approval;
mod crm;
mod notification;
mod purchase;
mod raffle;
mod referral;
mod user_admin;

pub use approval::ApprovalService;
pub use crm::{CrmService, age_bucket, aggregate_demographics};
pub use notification::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT, NotificationService};
pub use purchase::{PurchaseService, generate_payment_reference};
pub use raffle::{RaffleService, commitment_hash, pick_winner};
pub use referral::{REFERRAL_CODE_LEN, ReferralService, generate_referral_code};
pub use user_admin::UserAdminService;

use rand::Rng;

use crate::error::{ApiError, Result};
use crate::models::Profile;

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 生成大写字母与数字组成的随机码
pub(crate) fn random_code<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

pub(crate) fn require_admin(caller: &Profile) -> Result<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "role {} is not allowed to perform this action",
            caller.user_type
        )))
    }
}

pub(crate) fn require_advertiser_or_admin(caller: &Profile) -> Result<()> {
    if caller.user_type.is_advertiser_or_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "role {} is not allowed to perform this action",
            caller.user_type
        )))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use fake::Fake;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::Name;
    use uuid::Uuid;

    use crate::models::{Profile, UserType};

    pub fn profile(user_type: UserType, rifas: i64) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            full_name: Name().fake(),
            email: SafeEmail().fake(),
            user_type,
            rifas,
            cashback_cents: 0,
            birth_date: None,
            gender: None,
            city: None,
            state: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
