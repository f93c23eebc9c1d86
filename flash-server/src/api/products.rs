//! 商品接口

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use shared::models::{Product, ProductCreate, ProductUpdate};
use shared::ApiResponse;

use crate::auth::CurrentUser;
use crate::core::{AppState, ServiceError};
use crate::services;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PagedProducts {
    pub items: Vec<Product>,
    pub total: i64,
}

/// GET /products
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<ApiResponse<PagedProducts>, ServiceError> {
    let (items, total) = services::product::list(
        &state,
        query.page.unwrap_or(1),
        query.size.unwrap_or(20),
    )
    .await?;
    Ok(ApiResponse::success(PagedProducts { items, total }))
}

/// GET /product/{id}
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Product>, ServiceError> {
    let product = services::product::get_detail(&state, id).await?;
    Ok(ApiResponse::success(product))
}

/// GET /products/mine
pub async fn list_mine(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<ApiResponse<PagedProducts>, ServiceError> {
    let (items, total) = services::product::list_mine(
        &state,
        user.user_id,
        query.page.unwrap_or(1),
        query.size.unwrap_or(20),
    )
    .await?;
    Ok(ApiResponse::success(PagedProducts { items, total }))
}

/// POST /products
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ProductCreate>,
) -> Result<ApiResponse<Product>, ServiceError> {
    let product = services::product::create(&state, user.user_id, req).await?;
    Ok(ApiResponse::success(product))
}

/// PUT /products/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<ProductUpdate>,
) -> Result<ApiResponse<Product>, ServiceError> {
    let product = services::product::update(&state, id, user.user_id, req).await?;
    Ok(ApiResponse::success(product))
}

/// DELETE /products/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>, ServiceError> {
    services::product::delete(&state, id, user.user_id).await?;
    Ok(ApiResponse::ok())
}
