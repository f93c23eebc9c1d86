//! Coupon Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coupon kind, stored as a Postgres enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "coupon_kind", rename_all = "snake_case")]
pub enum CouponKind {
    /// 满减：amount_cents off when the order reaches min_spend_cents
    FullCut,
    /// 折扣：pay discount_rate percent of the base amount
    Discount,
}

/// Coupon template entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: i64,
    pub kind: CouponKind,
    pub title: String,
    pub description: String,
    /// Full-cut amount in cents (0 for discount coupons)
    pub amount_cents: i64,
    /// Discount percentage, 90 = pay 90% (0 for full-cut coupons)
    pub discount_rate: i32,
    pub min_spend_cents: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub purchasable: bool,
    pub price_cents: i64,
    pub status: String,
}

/// Template status values
pub const COUPON_TEMPLATE_ACTIVE: &str = "active";
pub const COUPON_TEMPLATE_INACTIVE: &str = "inactive";

/// User coupon status, stored as a Postgres enum
///
/// A row is either unbound and available, bound-and-used (`order_id` set),
/// or expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_coupon_status", rename_all = "snake_case")]
pub enum UserCouponStatus {
    Available,
    Used,
    Expired,
}

/// A coupon instance held by a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserCoupon {
    pub id: i64,
    pub user_id: i64,
    pub coupon_id: i64,
    pub status: UserCouponStatus,
    /// 来源：purchase / vip_month / ...
    pub obtained_from: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub order_id: Option<i64>,
    pub issued_at: DateTime<Utc>,
}
