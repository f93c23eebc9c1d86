//! Unified service-layer error type
//!
//! `ServiceError` bridges the gap between infrastructure errors
//! (`sqlx::Error`, `redis::RedisError`, broker errors) and the API-layer
//! error (`AppError`). It enables `?` propagation without manual
//! `.map_err(|e| { tracing::error!(...); AppError::new(...) })` boilerplate.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

/// Service-layer error
///
/// - `Db` / `Cache` / `Broker`: infrastructure errors (auto-logged, mapped
///   to the matching system error code)
/// - `App`: business-rule errors (transparent pass-through to the client)
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),
    #[error("broker error: {0}")]
    Broker(#[from] rdkafka::error::KafkaError),
    #[error(transparent)]
    App(#[from] AppError),
}

impl ServiceError {
    /// Business error from a bare code
    pub fn code(code: ErrorCode) -> Self {
        ServiceError::App(AppError::new(code))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::App(AppError::internal(format!("serialization error: {e}")))
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::DatabaseError)
            }
            ServiceError::Cache(cache_err) => {
                tracing::error!(error = %cache_err, "Service cache error");
                AppError::new(ErrorCode::CacheError)
            }
            ServiceError::Broker(broker_err) => {
                tracing::error!(error = %broker_err, "Service broker error");
                AppError::new(ErrorCode::BrokerError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_passthrough() {
        let err = ServiceError::code(ErrorCode::SoldOut);
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::SoldOut);
    }

    #[test]
    fn test_db_error_maps_to_database_code() {
        let err = ServiceError::Db(sqlx::Error::RowNotFound);
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::DatabaseError);
    }
}
