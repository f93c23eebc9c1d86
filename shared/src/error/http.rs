//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // Business outcomes of an accepted attempt are 200 with a
            // domain code in the envelope; the gateway retries on 5xx only.
            Self::SoldOut | Self::RepeatBuy => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::UserNotFound
            | Self::ProductNotFound
            | Self::OrderNotFound
            | Self::PaymentNotFound => StatusCode::NOT_FOUND,

            // 401 Unauthorized
            Self::Unauthorized
            | Self::PasswordWrong
            | Self::TokenInvalid
            | Self::TokenExpired => StatusCode::UNAUTHORIZED,

            // 429 Too Many Requests
            Self::TooManyRequests | Self::RiskBlocked | Self::RiskLimited => {
                StatusCode::TOO_MANY_REQUESTS
            }

            // 503 Service Unavailable (transient, client can retry)
            Self::ServiceBusy | Self::CacheError | Self::BrokerError => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation/business errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_status() {
        assert_eq!(ErrorCode::Success.http_status(), StatusCode::OK);
    }

    #[test]
    fn test_seckill_outcomes_are_http_ok() {
        assert_eq!(ErrorCode::SoldOut.http_status(), StatusCode::OK);
        assert_eq!(ErrorCode::RepeatBuy.http_status(), StatusCode::OK);
    }

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::ProductNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unauthorized_status() {
        assert_eq!(
            ErrorCode::Unauthorized.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::TokenExpired.http_status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_rate_limit_status() {
        assert_eq!(
            ErrorCode::TooManyRequests.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ErrorCode::RiskBlocked.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_transient_status() {
        assert_eq!(
            ErrorCode::ServiceBusy.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_bad_request_default() {
        assert_eq!(ErrorCode::NotStarted.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Ended.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::CouponBelowThreshold.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::UserExists.http_status(), StatusCode::BAD_REQUEST);
    }
}
