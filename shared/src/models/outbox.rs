//! Transactional outbox model
//!
//! A row exists iff its originating business mutation committed; the
//! dispatcher forwards rows to the broker and the compensator retries
//! anything left behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outbox message status, stored as SMALLINT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum OutboxStatus {
    Pending = 0,
    Sent = 1,
    /// Retry budget exhausted; payload preserved on the dead-letter topic
    Failed = 2,
}

/// Outbox message row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutboxMessage {
    pub id: i64,
    pub topic: String,
    /// JSON message body
    pub payload: String,
    pub status: OutboxStatus,
    pub retry_count: i32,
    pub last_error: String,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}
