//! 服务配置
//!
//! 所有配置项都可以通过环境变量覆盖：
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | HTTP_PORT | 8080 | HTTP 服务端口 |
//! | MACHINE_ID | 0 | 雪花 ID 机器号 (0..1024) |
//! | DATABASE_URL | postgres://localhost/flash | PostgreSQL 连接串 |
//! | DATABASE_MAX_CONNECTIONS | 50 | 连接池上限 |
//! | REDIS_URL | redis://127.0.0.1:6379 | Redis 连接串 |
//! | KAFKA_BROKERS | localhost:9092 | Kafka broker 列表（逗号分隔） |
//! | KAFKA_TOPIC | seckill | 秒杀消息主题 |
//! | KAFKA_DLQ_TOPIC | seckill-dlq | 死信主题 |
//! | KAFKA_GROUP_ID | sneaker-group | 消费组 |
//! | KAFKA_BATCH_SIZE | 100 | 批量消费数量 |
//! | KAFKA_FLUSH_INTERVAL_MS | 200 | 批量刷盘最大等待(毫秒) |
//! | KAFKA_MAX_RETRIES | 3 | 消息最大重试次数 |
//! | OUTBOX_SCAN_INTERVAL_SECS | 30 | Outbox 补偿扫描间隔 |
//! | OUTBOX_TIMEOUT_SECS | 60 | Outbox 消息超时阈值 |
//! | JWT_SECRET | (必填) | JWT 签名密钥 |
//! | RISK_ENABLE | true | 是否启用风控与限流 |

/// 服务器配置
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub jwt: JwtConfig,
    pub risk: RiskConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 雪花 ID 机器号
    pub machine_id: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// broker 列表，逗号分隔
    pub brokers: String,
    /// 秒杀消息主题
    pub topic: String,
    /// 死信主题
    pub dlq_topic: String,
    /// 消费组 id
    pub group_id: String,
    /// 批量消费数量
    pub batch_size: usize,
    /// 批量刷盘最大等待（毫秒）
    pub flush_interval_ms: u64,
    /// 消息最大重试次数
    pub max_retries: i32,
    /// Outbox 补偿扫描间隔（秒）
    pub outbox_scan_interval_secs: u64,
    /// Outbox 消息超时阈值（秒）
    pub outbox_timeout_secs: i64,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// JWT 签名密钥（至少 32 字节）
    pub secret: String,
    /// access token 有效期（秒）
    pub access_ttl_secs: i64,
    /// refresh token 有效期（秒）
    pub refresh_ttl_secs: i64,
}

/// 接口级限流参数
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// 每秒令牌
    pub rate: u32,
    /// 桶容量
    pub burst: u32,
}

#[derive(Debug, Clone)]
pub struct RiskConfig {
    /// 是否启用风控（黑/灰名单 + 限流）
    pub enable: bool,
    pub login_rate: RateLimit,
    pub seckill_rate: RateLimit,
    pub pay_rate: RateLimit,
    /// 热点商品（按 product_id）限流
    pub product_rate: RateLimit,
}

impl Config {
    /// 从环境变量加载配置，未设置时使用默认值
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                http_port: env_parse("HTTP_PORT", 8080),
                machine_id: env_parse("MACHINE_ID", 0),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgres://localhost/flash".into()),
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 50),
            },
            redis: RedisConfig {
                url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            },
            kafka: KafkaConfig {
                brokers: std::env::var("KAFKA_BROKERS")
                    .unwrap_or_else(|_| "localhost:9092".into()),
                topic: std::env::var("KAFKA_TOPIC").unwrap_or_else(|_| "seckill".into()),
                dlq_topic: std::env::var("KAFKA_DLQ_TOPIC")
                    .unwrap_or_else(|_| "seckill-dlq".into()),
                group_id: std::env::var("KAFKA_GROUP_ID")
                    .unwrap_or_else(|_| "sneaker-group".into()),
                batch_size: env_parse("KAFKA_BATCH_SIZE", 100),
                flush_interval_ms: env_parse("KAFKA_FLUSH_INTERVAL_MS", 200),
                max_retries: env_parse("KAFKA_MAX_RETRIES", 3),
                outbox_scan_interval_secs: env_parse("OUTBOX_SCAN_INTERVAL_SECS", 30),
                outbox_timeout_secs: env_parse("OUTBOX_TIMEOUT_SECS", 60),
            },
            jwt: JwtConfig {
                secret: std::env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
                access_ttl_secs: env_parse("JWT_ACCESS_TTL_SECS", 7200),
                refresh_ttl_secs: env_parse("JWT_REFRESH_TTL_SECS", 7200 * 7),
            },
            risk: RiskConfig {
                enable: env_parse("RISK_ENABLE", true),
                login_rate: RateLimit {
                    rate: env_parse("RISK_LOGIN_RATE", 5),
                    burst: env_parse("RISK_LOGIN_BURST", 5),
                },
                seckill_rate: RateLimit {
                    rate: env_parse("RISK_SECKILL_RATE", 200),
                    burst: env_parse("RISK_SECKILL_BURST", 400),
                },
                pay_rate: RateLimit {
                    rate: env_parse("RISK_PAY_RATE", 50),
                    burst: env_parse("RISK_PAY_BURST", 100),
                },
                product_rate: RateLimit {
                    rate: env_parse("RISK_PRODUCT_RATE", 100),
                    burst: env_parse("RISK_PRODUCT_BURST", 200),
                },
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
