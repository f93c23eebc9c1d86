//! 用户接口

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use shared::models::User;
use shared::{ApiResponse, AppError};

use crate::auth::CurrentUser;
use crate::core::{AppState, ServiceError};
use crate::services;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<ApiResponse<()>, ServiceError> {
    if req.username.is_empty() || req.password.len() < 6 {
        return Err(AppError::invalid_params("用户名不能为空，密码至少 6 位").into());
    }
    services::user::register(&state.pool, &req.username, &req.password).await?;
    Ok(ApiResponse::ok())
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<ApiResponse<TokenPair>, ServiceError> {
    let (access_token, refresh_token) =
        services::user::login(&state, &req.username, &req.password).await?;
    Ok(ApiResponse::success(TokenPair {
        access_token,
        refresh_token,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access_token: String,
}

/// POST /refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<ApiResponse<AccessToken>, ServiceError> {
    let access_token = state
        .jwt
        .refresh_access(&req.refresh_token)
        .map_err(|e| match e {
            crate::auth::jwt::JwtError::ExpiredToken => AppError::token_expired(),
            _ => AppError::invalid_token("refresh token 无效"),
        })?;
    Ok(ApiResponse::success(AccessToken { access_token }))
}

/// GET /profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<ApiResponse<User>, ServiceError> {
    let user = services::user::get_profile(&state.pool, user.user_id).await?;
    Ok(ApiResponse::success(user))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub avatar: Option<String>,
}

/// PUT /profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<ApiResponse<User>, ServiceError> {
    let user = services::user::update_profile(
        &state.pool,
        user.user_id,
        req.username.as_deref(),
        req.avatar.as_deref(),
    )
    .await?;
    Ok(ApiResponse::success(user))
}
