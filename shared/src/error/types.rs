//! Error types and the API response envelope

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application error with a structured error code
///
/// The primary error type crossing the service → handler boundary. Carries a
/// standardized [`ErrorCode`] and a human-readable message.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // ==================== Convenience constructors ====================

    /// Create an invalid-params error
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidParams, msg)
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::NotFound, format!("{} not found", resource.into()))
    }

    /// Create an unauthorized error
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized)
    }

    /// Create an invalid token error
    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::TokenInvalid, msg)
    }

    /// Create a token expired error
    pub fn token_expired() -> Self {
        Self::new(ErrorCode::TokenExpired)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a service-busy error (transient infra failure)
    pub fn busy() -> Self {
        Self::new(ErrorCode::ServiceBusy)
    }
}

/// Unified API response envelope: `{ code, msg, data }`
///
/// Success uses `code = 200`; errors carry the domain code and a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Domain code (200 for success)
    pub code: u16,
    /// Human-readable message
    pub msg: String,
    /// Response payload (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create a success response with data
    pub fn success(data: T) -> Self {
        Self {
            code: ErrorCode::Success.code(),
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create an error response from an AppError
    pub fn error(err: &AppError) -> Self {
        Self {
            code: err.code.code(),
            msg: err.message.clone(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    /// Create a success response without data
    pub fn ok() -> Self {
        Self {
            code: ErrorCode::Success.code(),
            msg: "ok".to_string(),
            data: None,
        }
    }
}

impl<T> From<AppError> for ApiResponse<T> {
    fn from(err: AppError) -> Self {
        Self {
            code: err.code.code(),
            msg: err.message,
            data: None,
        }
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ApiResponse::<()>::error(&self);

        if matches!(
            self.code.category(),
            super::category::ErrorCategory::System
        ) {
            tracing::error!(code = %self.code, message = %self.message, "System error");
        }

        (status, Json(body)).into_response()
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = ErrorCode::try_from(self.code)
            .map(|c| c.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::SoldOut);
        assert_eq!(err.code, ErrorCode::SoldOut);
        assert_eq!(err.message, "Sold out");
    }

    #[test]
    fn test_app_error_with_message() {
        let err = AppError::with_message(ErrorCode::InvalidParams, "product_id is required");
        assert_eq!(err.code, ErrorCode::InvalidParams);
        assert_eq!(err.message, "product_id is required");
    }

    #[test]
    fn test_app_error_http_status() {
        assert_eq!(
            AppError::new(ErrorCode::ProductNotFound).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::unauthorized().http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::busy().http_status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_envelope_success_shape() {
        let resp = ApiResponse::success(serde_json::json!({"order_num": "123"}));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["code"], 200);
        assert_eq!(value["msg"], "ok");
        assert_eq!(value["data"]["order_num"], "123");
    }

    #[test]
    fn test_envelope_error_shape() {
        let resp = ApiResponse::<()>::error(&AppError::new(ErrorCode::RepeatBuy));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["code"], 30002);
        assert!(value.get("data").is_none());
    }
}
