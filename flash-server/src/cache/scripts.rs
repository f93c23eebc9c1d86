//! 预占原子脚本
//!
//! 单次往返完成「查重 → 查库存 → 扣减 → 记录用户」，Redis 单线程执行
//! 脚本保证线性化，消除 check/decrement 竞争窗口。

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::sync::OnceLock;

use super::keys;
use crate::core::ServiceResult;

// key1 商品库存
// key2 商品购买用户集合
// argv1 用户 id
const RESERVE_LUA: &str = r#"
-- 1. 检查用户是否已经抢购过
if redis.call("SISMEMBER", KEYS[2], ARGV[1]) == 1 then
    return -1
end

-- 2. 检查库存是否充足
local stock = tonumber(redis.call("GET", KEYS[1]))
if stock == nil or stock <= 0 then
    return 0
end

-- 3. 扣减库存并记录该用户
redis.call("DECR", KEYS[1])
redis.call("SADD", KEYS[2], ARGV[1])
return 1
"#;

fn reserve_script() -> &'static Script {
    static SCRIPT: OnceLock<Script> = OnceLock::new();
    SCRIPT.get_or_init(|| Script::new(RESERVE_LUA))
}

/// 预占脚本的三种结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// 抢到了：库存已扣减，用户已入集合
    Reserved,
    /// 库存不足
    SoldOut,
    /// 重复抢购
    Repeat,
}

/// 执行预占脚本
///
/// 传输错误向上抛出：调用方必须把它当作「结果未知」拒绝本次请求，
/// 不能回滚（脚本可能已经执行成功）。
pub async fn reserve(
    conn: &mut ConnectionManager,
    product_id: i64,
    user_id: i64,
) -> ServiceResult<ReserveOutcome> {
    let res: i64 = reserve_script()
        .key(keys::stock_key(product_id))
        .key(keys::users_key(product_id))
        .arg(user_id)
        .invoke_async(conn)
        .await?;

    Ok(match res {
        1 => ReserveOutcome::Reserved,
        -1 => ReserveOutcome::Repeat,
        _ => ReserveOutcome::SoldOut,
    })
}

/// 回补库存并移除用户标记
///
/// 预占成功但后续落盘失败时调用，避免库存被锁死。两个操作都幂等，
/// 失败只记日志（补偿属于尽力而为，最终一致由库存刷新兜底）。
pub async fn rollback_reservation(conn: &mut ConnectionManager, product_id: i64, user_id: i64) {
    let stock_key = keys::stock_key(product_id);
    let users_key = keys::users_key(product_id);

    if let Err(e) = conn.incr::<_, _, i64>(&stock_key, 1).await {
        tracing::error!(product_id, error = %e, "Failed to restore cached stock");
    }
    if let Err(e) = conn.srem::<_, _, i64>(&users_key, user_id).await {
        tracing::error!(product_id, user_id, error = %e, "Failed to remove winner mark");
    }
}

/// 覆盖写入库存计数器（无 TTL，最新值为准）
pub async fn set_stock(
    conn: &mut ConnectionManager,
    product_id: i64,
    stock: i64,
) -> ServiceResult<()> {
    conn.set::<_, _, ()>(keys::stock_key(product_id), stock).await?;
    Ok(())
}
