//! 用户档案实体

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::UserType;

/// 用户档案
///
/// `id` 与身份服务中的用户 ID 一致，角色判断以此表的 `user_type` 为准
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub user_type: UserType,
    /// rifa 余额，永不为负
    pub rifas: i64,
    /// 现金返还余额（分）
    pub cashback_cents: i64,
    #[sqlx(default)]
    pub birth_date: Option<NaiveDate>,
    #[sqlx(default)]
    pub gender: Option<String>,
    #[sqlx(default)]
    pub city: Option<String>,
    #[sqlx(default)]
    pub state: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.user_type.is_admin()
    }

    pub fn can_afford(&self, cost: i64) -> bool {
        self.rifas >= cost
    }
}

/// 新建档案参数
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub user_type: UserType,
    pub rifas: i64,
}

/// 计算指定日期时的周岁年龄
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let birth = date(2000, 6, 15);
        assert_eq!(age_on(birth, date(2024, 6, 14)), 23);
        assert_eq!(age_on(birth, date(2024, 6, 15)), 24);
        assert_eq!(age_on(birth, date(2024, 12, 31)), 24);
    }

    #[test]
    fn test_leap_day_birth() {
        let birth = date(2004, 2, 29);
        assert_eq!(age_on(birth, date(2023, 2, 28)), 18);
        assert_eq!(age_on(birth, date(2023, 3, 1)), 19);
    }
}
