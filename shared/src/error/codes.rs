//! Unified error codes for the flash-sale engine
//!
//! Error codes are shared between the API process, the worker and the
//! frontend. They are organized by domain:
//! - 0xx–6xx: General (mirror the HTTP status where one exists)
//! - 7xx: Risk control
//! - 9xxx: System errors
//! - 10xxx: User errors
//! - 20xxx: Product errors
//! - 30xxx: Seckill errors
//! - 40xxx: Order errors
//! - 50xxx: Payment errors
//! - 60xxx: Coupon errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== General ====================
    /// Operation completed successfully
    Success = 200,
    /// Malformed or missing request parameters
    InvalidParams = 400,
    /// Missing or invalid authentication
    Unauthorized = 401,
    /// Resource not found
    NotFound = 404,
    /// Too many requests (rate limited)
    TooManyRequests = 429,
    /// Internal server error
    InternalError = 500,

    // ==================== 7xx: Risk ====================
    /// Blacklisted IP or user
    RiskBlocked = 700,
    /// Graylisted IP or user
    RiskLimited = 701,

    // ==================== 9xxx: System ====================
    /// Transient infrastructure failure, client should retry
    ServiceBusy = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Shared cache error
    CacheError = 9003,
    /// Message broker error
    BrokerError = 9004,

    // ==================== 10xxx: User ====================
    /// Username already taken
    UserExists = 10001,
    /// User not found
    UserNotFound = 10002,
    /// Wrong password
    PasswordWrong = 10003,
    /// Authentication token is invalid
    TokenInvalid = 10004,
    /// Authentication token has expired
    TokenExpired = 10005,

    // ==================== 20xxx: Product ====================
    /// Product not found
    ProductNotFound = 20001,

    // ==================== 30xxx: Seckill ====================
    /// Stock exhausted
    SoldOut = 30001,
    /// User already purchased this product
    RepeatBuy = 30002,
    /// Sale has not started yet
    NotStarted = 30003,
    /// Sale has ended
    Ended = 30004,

    // ==================== 40xxx: Order ====================
    /// Order not found
    OrderNotFound = 40001,

    // ==================== 50xxx: Payment ====================
    /// Payment not found
    PaymentNotFound = 50001,
    /// Unsupported payment target status
    UnsupportedStatus = 50002,

    // ==================== 60xxx: Coupon ====================
    /// Coupon not found
    CouponNotFound = 60001,
    /// Coupon is not in available state
    CouponNotAvailable = 60002,
    /// Coupon outside its validity window
    CouponExpired = 60003,
    /// Order amount below the coupon threshold
    CouponBelowThreshold = 60004,
    /// Coupon template is not purchasable
    CouponNotPurchasable = 60005,
    /// Discount rate outside (0, 100)
    CouponInvalidRate = 60006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "ok",
            ErrorCode::InvalidParams => "Invalid request parameters",
            ErrorCode::Unauthorized => "Not authenticated",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::TooManyRequests => "Too many requests",
            ErrorCode::InternalError => "Internal server error",

            // Risk
            ErrorCode::RiskBlocked => "Access blocked",
            ErrorCode::RiskLimited => "Access limited",

            // System
            ErrorCode::ServiceBusy => "Service busy, please retry later",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::CacheError => "Cache error",
            ErrorCode::BrokerError => "Message broker error",

            // User
            ErrorCode::UserExists => "Username already exists",
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::PasswordWrong => "Wrong username or password",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::TokenExpired => "Authentication token has expired",

            // Product
            ErrorCode::ProductNotFound => "Product not found",

            // Seckill
            ErrorCode::SoldOut => "Sold out",
            ErrorCode::RepeatBuy => "Already purchased this product",
            ErrorCode::NotStarted => "Sale has not started",
            ErrorCode::Ended => "Sale has ended",

            // Order
            ErrorCode::OrderNotFound => "Order not found",

            // Payment
            ErrorCode::PaymentNotFound => "Payment not found",
            ErrorCode::UnsupportedStatus => "Unsupported payment status",

            // Coupon
            ErrorCode::CouponNotFound => "Coupon not found",
            ErrorCode::CouponNotAvailable => "Coupon is not available",
            ErrorCode::CouponExpired => "Coupon has expired",
            ErrorCode::CouponBelowThreshold => "Order amount below coupon threshold",
            ErrorCode::CouponNotPurchasable => "Coupon is not purchasable",
            ErrorCode::CouponInvalidRate => "Invalid coupon discount rate",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            200 => Ok(ErrorCode::Success),
            400 => Ok(ErrorCode::InvalidParams),
            401 => Ok(ErrorCode::Unauthorized),
            404 => Ok(ErrorCode::NotFound),
            429 => Ok(ErrorCode::TooManyRequests),
            500 => Ok(ErrorCode::InternalError),

            // Risk
            700 => Ok(ErrorCode::RiskBlocked),
            701 => Ok(ErrorCode::RiskLimited),

            // System
            9001 => Ok(ErrorCode::ServiceBusy),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::CacheError),
            9004 => Ok(ErrorCode::BrokerError),

            // User
            10001 => Ok(ErrorCode::UserExists),
            10002 => Ok(ErrorCode::UserNotFound),
            10003 => Ok(ErrorCode::PasswordWrong),
            10004 => Ok(ErrorCode::TokenInvalid),
            10005 => Ok(ErrorCode::TokenExpired),

            // Product
            20001 => Ok(ErrorCode::ProductNotFound),

            // Seckill
            30001 => Ok(ErrorCode::SoldOut),
            30002 => Ok(ErrorCode::RepeatBuy),
            30003 => Ok(ErrorCode::NotStarted),
            30004 => Ok(ErrorCode::Ended),

            // Order
            40001 => Ok(ErrorCode::OrderNotFound),

            // Payment
            50001 => Ok(ErrorCode::PaymentNotFound),
            50002 => Ok(ErrorCode::UnsupportedStatus),

            // Coupon
            60001 => Ok(ErrorCode::CouponNotFound),
            60002 => Ok(ErrorCode::CouponNotAvailable),
            60003 => Ok(ErrorCode::CouponExpired),
            60004 => Ok(ErrorCode::CouponBelowThreshold),
            60005 => Ok(ErrorCode::CouponNotPurchasable),
            60006 => Ok(ErrorCode::CouponInvalidRate),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 200);
        assert_eq!(ErrorCode::InvalidParams.code(), 400);
        assert_eq!(ErrorCode::Unauthorized.code(), 401);
        assert_eq!(ErrorCode::TooManyRequests.code(), 429);
        assert_eq!(ErrorCode::InternalError.code(), 500);
        assert_eq!(ErrorCode::RiskBlocked.code(), 700);

        assert_eq!(ErrorCode::UserExists.code(), 10001);
        assert_eq!(ErrorCode::UserNotFound.code(), 10002);
        assert_eq!(ErrorCode::ProductNotFound.code(), 20001);
        assert_eq!(ErrorCode::SoldOut.code(), 30001);
        assert_eq!(ErrorCode::RepeatBuy.code(), 30002);
        assert_eq!(ErrorCode::OrderNotFound.code(), 40001);
        assert_eq!(ErrorCode::PaymentNotFound.code(), 50001);
        assert_eq!(ErrorCode::CouponNotFound.code(), 60001);
    }

    #[test]
    fn test_round_trip_conversion() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::RiskBlocked,
            ErrorCode::ServiceBusy,
            ErrorCode::UserExists,
            ErrorCode::SoldOut,
            ErrorCode::RepeatBuy,
            ErrorCode::CouponBelowThreshold,
        ];
        for code in codes {
            let value: u16 = code.into();
            assert_eq!(ErrorCode::try_from(value).unwrap(), code);
        }
    }

    #[test]
    fn test_invalid_code() {
        assert_eq!(ErrorCode::try_from(12345), Err(InvalidErrorCode(12345)));
    }

    #[test]
    fn test_serde_as_u16() {
        let json = serde_json::to_string(&ErrorCode::SoldOut).unwrap();
        assert_eq!(json, "30001");
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::SoldOut);
    }
}
