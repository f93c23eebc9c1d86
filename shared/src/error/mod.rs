//! Unified error system for the flash-sale engine
//!
//! This module provides:
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Error type with code and message
//! - [`ApiResponse`]: Unified API response envelope
//!
//! # Error Code Ranges
//!
//! - 0xx–6xx: General / transport-level codes (mirror HTTP where sensible)
//! - 7xx: Risk-control rejections
//! - 9xxx: System errors
//! - 10xxx: User errors
//! - 20xxx: Product errors
//! - 30xxx: Seckill errors
//! - 40xxx: Order errors
//! - 50xxx: Payment errors
//! - 60xxx: Coupon errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::SoldOut);
//! let err = AppError::with_message(ErrorCode::InvalidParams, "product_id is required");
//! let response = ApiResponse::<()>::error(&err);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
