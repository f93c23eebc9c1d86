//! Paid VIP Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Paid VIP record: one row per user with level and validity interval
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaidVip {
    pub id: i64,
    pub user_id: i64,
    pub level: i32,
    pub started_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
}
