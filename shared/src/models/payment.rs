//! Payment Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment status, stored as a Postgres enum
///
/// `pending` is the only non-terminal state; the reconciler moves a payment
/// to `paid`, `failed` or `refunded` exactly once via a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Payment entity, one per order
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    /// 支付单号（雪花 ID），回调按此定位
    pub payment_id: String,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    /// Opaque gateway callback payload
    pub notify_data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
