//! flash-worker: 订单物化 worker
//!
//! 批量消费秒杀队列，幂等落库订单/支付单，改写 pending 终态。

use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use flash_server::broker::{BatchConsumer, Producer};
use flash_server::cache::CacheWorkers;
use flash_server::core::Config;
use flash_server::db;
use flash_server::services::materializer::Materializer;
use flash_server::utils::IdGenerator;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flash_worker=info,flash_server=info".into()),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        topic = %config.kafka.topic,
        group = %config.kafka.group_id,
        "Starting flash-worker"
    );

    let pool = db::connect(&config.database).await?;
    let client = redis::Client::open(config.redis.url.as_str())?;
    let redis = ConnectionManager::new(client).await?;
    let producer = Producer::new(&config.kafka)?;
    let cache_workers = CacheWorkers::spawn(redis.clone());
    let ids = Arc::new(IdGenerator::new(config.server.machine_id));

    let materializer = Materializer::new(pool, redis, cache_workers, ids);
    let consumer = BatchConsumer::new(&config.kafka, producer)?;

    let shutdown = CancellationToken::new();
    {
        let token = shutdown.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            token.cancel();
        });
    }

    consumer.run(&materializer, shutdown).await;
    Ok(())
}
