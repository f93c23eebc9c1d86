//! User Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity
///
/// `total_spent_cents` and `growth_level` are updated only by the payment
/// reconciler under a row lock.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub balance_cents: i64,
    pub avatar: String,
    /// 累计实付金额（分），单调不减
    pub total_spent_cents: i64,
    /// Growth tier derived from total_spent_cents via fixed thresholds
    pub growth_level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
