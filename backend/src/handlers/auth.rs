//! Authentication HTTP handlers

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use validator::Validate;

use crate::auth::{AuthService, AuthTokensResponse, LoginRequest, RefreshTokenRequest, RegisterRequest};
use crate::error::ApiError;
use crate::models::ApiResponse;

/// POST /api/v1/auth/register
pub async fn register(
    State(service): State<Arc<AuthService>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthTokensResponse>>), ApiError> {
    request.validate()?;
    let tokens = service.register(request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(tokens))))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(service): State<Arc<AuthService>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthTokensResponse>>, ApiError> {
    request.validate()?;
    let tokens = service.login(request).await?;

    Ok(Json(ApiResponse::success(tokens)))
}

/// POST /api/v1/auth/refresh
pub async fn refresh_token(
    State(service): State<Arc<AuthService>>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<AuthTokensResponse>>, ApiError> {
    let tokens = service.refresh_tokens(&request.refresh_token).await?;

    Ok(Json(ApiResponse::success(tokens)))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(service): State<Arc<AuthService>>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<StatusCode, ApiError> {
    service.revoke_refresh_token(&request.refresh_token).await?;

    Ok(StatusCode::NO_CONTENT)
}
