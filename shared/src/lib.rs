//! Shared types for the flash-sale engine
//!
//! Error codes, the API response envelope and the persisted data models
//! used by both the API process and the materializer worker.

pub mod error;
pub mod models;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
