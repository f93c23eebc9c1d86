//! Order Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order status, stored as SMALLINT
///
/// Transitions are `unpaid → paid | failed`, both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum OrderStatus {
    Unpaid = 0,
    Paid = 1,
    Failed = 2,
}

/// Order entity
///
/// `(user_id, product_id)` is unique: one purchase per user per product.
/// `order_num` is the snowflake identity shared with the broker message.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub order_num: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
