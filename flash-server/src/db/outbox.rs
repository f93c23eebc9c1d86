//! 本地消息表操作（Transactional Outbox）

use chrono::{Duration, Utc};
use sqlx::PgExecutor;

use shared::models::{OutboxMessage, OutboxStatus};

/// 创建待发送消息
pub async fn create(
    exec: impl PgExecutor<'_>,
    topic: &str,
    payload: &str,
) -> Result<OutboxMessage, sqlx::Error> {
    sqlx::query_as::<_, OutboxMessage>(
        "INSERT INTO outbox_messages (topic, payload) VALUES ($1, $2) RETURNING *",
    )
    .bind(topic)
    .bind(payload)
    .fetch_one(exec)
    .await
}

/// 标记为已发送
pub async fn mark_sent(exec: impl PgExecutor<'_>, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE outbox_messages SET status = $2, sent_at = now() WHERE id = $1")
        .bind(id)
        .bind(OutboxStatus::Sent as i16)
        .execute(exec)
        .await?;
    Ok(())
}

/// 标记为发送失败（重试耗尽）
pub async fn mark_failed(
    exec: impl PgExecutor<'_>,
    id: i64,
    last_error: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE outbox_messages SET status = $2, last_error = $3 WHERE id = $1")
        .bind(id)
        .bind(OutboxStatus::Failed as i16)
        .bind(last_error)
        .execute(exec)
        .await?;
    Ok(())
}

/// 增加重试次数并记录错误
pub async fn incr_retry(
    exec: impl PgExecutor<'_>,
    id: i64,
    last_error: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE outbox_messages SET retry_count = retry_count + 1, last_error = $2 WHERE id = $1",
    )
    .bind(id)
    .bind(last_error)
    .execute(exec)
    .await?;
    Ok(())
}

/// 获取超时未发送的消息（补偿扫描），最旧优先
pub async fn pending_messages(
    exec: impl PgExecutor<'_>,
    timeout_secs: i64,
    limit: i64,
) -> Result<Vec<OutboxMessage>, sqlx::Error> {
    let cutoff = Utc::now() - Duration::seconds(timeout_secs);
    sqlx::query_as::<_, OutboxMessage>(
        "SELECT * FROM outbox_messages
         WHERE status = $1 AND created_at < $2
         ORDER BY created_at ASC
         LIMIT $3",
    )
    .bind(OutboxStatus::Pending as i16)
    .bind(cutoff)
    .bind(limit)
    .fetch_all(exec)
    .await
}

/// 清理已发送超过指定天数的消息
pub async fn cleanup_old(exec: impl PgExecutor<'_>, days: i64) -> Result<u64, sqlx::Error> {
    let cutoff = Utc::now() - Duration::days(days);
    let result = sqlx::query("DELETE FROM outbox_messages WHERE status = $1 AND sent_at < $2")
        .bind(OutboxStatus::Sent as i16)
        .bind(cutoff)
        .execute(exec)
        .await?;
    Ok(result.rows_affected())
}
