//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// - 0xx–6xx: General
/// - 7xx: Risk
/// - 9xxx: System
/// - 10xxx: User
/// - 20xxx: Product
/// - 30xxx: Seckill
/// - 40xxx: Order
/// - 50xxx: Payment
/// - 60xxx: Coupon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (transport-level)
    General,
    /// Risk-control rejections (7xx)
    Risk,
    /// System errors (9xxx)
    System,
    /// User errors (10xxx)
    User,
    /// Product errors (20xxx)
    Product,
    /// Seckill errors (30xxx)
    Seckill,
    /// Order errors (40xxx)
    Order,
    /// Payment errors (50xxx)
    Payment,
    /// Coupon errors (60xxx)
    Coupon,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..700 => Self::General,
            700..1000 => Self::Risk,
            9000..10000 => Self::System,
            10000..20000 => Self::User,
            20000..30000 => Self::Product,
            30000..40000 => Self::Seckill,
            40000..50000 => Self::Order,
            50000..60000 => Self::Payment,
            60000..65535 => Self::Coupon,
            _ => Self::General,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Risk => "risk",
            Self::System => "system",
            Self::User => "user",
            Self::Product => "product",
            Self::Seckill => "seckill",
            Self::Order => "order",
            Self::Payment => "payment",
            Self::Coupon => "coupon",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(200), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(500), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(700), ErrorCategory::Risk);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10001), ErrorCategory::User);
        assert_eq!(ErrorCategory::from_code(20001), ErrorCategory::Product);
        assert_eq!(ErrorCategory::from_code(30001), ErrorCategory::Seckill);
        assert_eq!(ErrorCategory::from_code(40001), ErrorCategory::Order);
        assert_eq!(ErrorCategory::from_code(50001), ErrorCategory::Payment);
        assert_eq!(ErrorCategory::from_code(60001), ErrorCategory::Coupon);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::InvalidParams.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::RiskBlocked.category(), ErrorCategory::Risk);
        assert_eq!(ErrorCode::ServiceBusy.category(), ErrorCategory::System);
        assert_eq!(ErrorCode::UserExists.category(), ErrorCategory::User);
        assert_eq!(ErrorCode::SoldOut.category(), ErrorCategory::Seckill);
        assert_eq!(ErrorCode::PaymentNotFound.category(), ErrorCategory::Payment);
        assert_eq!(ErrorCode::CouponExpired.category(), ErrorCategory::Coupon);
    }

    #[test]
    fn test_category_name() {
        assert_eq!(ErrorCategory::General.name(), "general");
        assert_eq!(ErrorCategory::Risk.name(), "risk");
        assert_eq!(ErrorCategory::Seckill.name(), "seckill");
        assert_eq!(ErrorCategory::Coupon.name(), "coupon");
    }
}
