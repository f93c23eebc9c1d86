//! 商品服务
//!
//! 公开读走缓存；归属者增删改后主动播种库存计数器并失效详情缓存，
//! 让秒杀入口读到新值。

use shared::error::ErrorCode;
use shared::models::{Product, ProductCreate, ProductUpdate};

use crate::cache::scripts;
use crate::core::{AppState, ServiceError, ServiceResult};
use crate::db;

/// 分页查询商品列表
pub async fn list(state: &AppState, page: i64, page_size: i64) -> ServiceResult<(Vec<Product>, i64)> {
    let page = page.max(1);
    let page_size = if page_size <= 0 || page_size > 100 {
        20
    } else {
        page_size
    };
    Ok(db::product::list(&state.pool, page, page_size).await?)
}

/// 查询商品详情（缓存 + single-flight）
pub async fn get_detail(state: &AppState, product_id: i64) -> ServiceResult<Product> {
    let mut conn = state.redis.clone();
    state
        .product_cache
        .get(&mut conn, &state.pool, product_id)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::ProductNotFound))
}

/// 查询当前用户创建的商品
pub async fn list_mine(
    state: &AppState,
    owner_id: i64,
    page: i64,
    page_size: i64,
) -> ServiceResult<(Vec<Product>, i64)> {
    let page = page.max(1);
    let page_size = if page_size <= 0 || page_size > 100 {
        20
    } else {
        page_size
    };
    Ok(db::product::list_by_owner(&state.pool, owner_id, page, page_size).await?)
}

/// 创建商品并播种库存计数器
pub async fn create(
    state: &AppState,
    owner_id: i64,
    payload: ProductCreate,
) -> ServiceResult<Product> {
    if payload.name.is_empty() || payload.price_cents <= 0 || payload.stock < 0 {
        return Err(ServiceError::code(ErrorCode::InvalidParams));
    }
    let product = db::product::create(&state.pool, owner_id, &payload).await?;

    let mut conn = state.redis.clone();
    if let Err(e) = scripts::set_stock(&mut conn, product.id, product.stock as i64).await {
        tracing::warn!(product_id = product.id, error = %e, "Stock counter seed failed");
    }

    Ok(product)
}

/// 限定创建者更新商品；库存变更同步计数器，任何变更失效详情缓存
pub async fn update(
    state: &AppState,
    product_id: i64,
    owner_id: i64,
    payload: ProductUpdate,
) -> ServiceResult<Product> {
    let product = db::product::update_by_owner(&state.pool, product_id, owner_id, &payload)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::ProductNotFound))?;

    if payload.stock.is_some() {
        let mut conn = state.redis.clone();
        if let Err(e) = scripts::set_stock(&mut conn, product.id, product.stock as i64).await {
            tracing::warn!(product_id = product.id, error = %e, "Stock counter seed failed");
        }
    }
    state.cache_workers.invalidate_product_info(product_id);

    Ok(product)
}

/// 软删除商品并失效详情缓存
pub async fn delete(state: &AppState, product_id: i64, owner_id: i64) -> ServiceResult<()> {
    let rows = db::product::soft_delete(&state.pool, product_id, owner_id).await?;
    if rows == 0 {
        return Err(ServiceError::code(ErrorCode::ProductNotFound));
    }
    state.cache_workers.invalidate_product_info(product_id);
    Ok(())
}
