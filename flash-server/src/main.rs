//! flash-server: 秒杀 API 服务
//!
//! 长驻进程：
//! - HTTP API（准入限流 → 原子预占 → Outbox）
//! - Outbox 即时转发与周期补偿
//! - 缓存一致性 worker pool
//! - 定时任务（月度 VIP 发券、券过期清扫）

use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

use flash_server::api;
use flash_server::core::{AppState, Config};
use flash_server::jobs;
use flash_server::limiter::local::CLEANUP_INTERVAL;
use flash_server::outbox::OutboxDispatcher;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flash_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(port = config.server.http_port, "Starting flash-server");

    let state = AppState::new(config).await?;
    let shutdown = CancellationToken::new();

    // Outbox 补偿
    let dispatcher = OutboxDispatcher::new(
        state.pool.clone(),
        state.producer.clone(),
        &state.config.kafka,
    );
    tokio::spawn(dispatcher.run(shutdown.clone()));

    // 定时任务
    tokio::spawn(jobs::run_vip_monthly(state.pool.clone(), shutdown.clone()));
    tokio::spawn(jobs::run_coupon_expiry(state.pool.clone(), shutdown.clone()));

    // 本地限流器 janitor
    {
        let limiters = state.limiters.clone();
        let token = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = ticker.tick() => limiters.cleanup(),
                }
            }
        });
    }

    let app = api::create_router(state.clone());
    let addr = format!("0.0.0.0:{}", state.config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("flash-server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await?;

    shutdown.cancel();
    Ok(())
}

async fn shutdown_signal(token: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
    token.cancel();
}
