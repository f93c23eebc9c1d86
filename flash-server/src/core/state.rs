//! 应用状态 - 持有所有共享句柄的单例
//!
//! 所有后端句柄在进程启动时初始化一次，通过构造函数显式传递，
//! `Clone` 只是引用计数拷贝。

use redis::aio::ConnectionManager;
use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::JwtService;
use crate::broker::Producer;
use crate::cache::{CacheWorkers, ProductCache};
use crate::core::Config;
use crate::db;
use crate::limiter::LimiterRegistry;
use crate::utils::IdGenerator;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 共享应用状态
#[derive(Clone)]
pub struct AppState {
    /// 服务配置（不可变）
    pub config: Arc<Config>,
    /// PostgreSQL 连接池
    pub pool: PgPool,
    /// Redis 连接（自动重连）
    pub redis: ConnectionManager,
    /// Kafka 生产者
    pub producer: Producer,
    /// JWT 认证服务
    pub jwt: Arc<JwtService>,
    /// 雪花 ID 生成器
    pub ids: Arc<IdGenerator>,
    /// 本地限流器注册表
    pub limiters: LimiterRegistry,
    /// 缓存一致性 worker
    pub cache_workers: CacheWorkers,
    /// 商品详情缓存（single-flight）
    pub product_cache: ProductCache,
}

impl AppState {
    /// 初始化应用状态
    ///
    /// 依次建立：数据库连接池（含迁移）、Redis 连接、Kafka 生产者、
    /// 缓存 worker pool。
    pub async fn new(config: Config) -> Result<Self, BoxError> {
        let pool = db::connect(&config.database).await?;

        let client = redis::Client::open(config.redis.url.as_str())?;
        let redis = ConnectionManager::new(client).await?;

        let producer = Producer::new(&config.kafka)?;
        let cache_workers = CacheWorkers::spawn(redis.clone());

        let jwt = Arc::new(JwtService::new(&config.jwt));
        let ids = Arc::new(IdGenerator::new(config.server.machine_id));

        Ok(Self {
            config: Arc::new(config),
            pool,
            redis,
            producer,
            jwt,
            ids,
            limiters: LimiterRegistry::new(),
            cache_workers,
            product_cache: ProductCache::new(),
        })
    }
}
