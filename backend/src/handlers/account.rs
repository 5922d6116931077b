//! Account, preference, ledger and admin handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::{AdminUser, AuthenticatedUser};
use crate::account::{
    AccountResponse, AccountService, CreateEmployeeRequest, CreditTransaction, Preferences,
    UpdateCapabilitiesRequest, UpdatePreferencesRequest,
};
use crate::error::ApiError;
use crate::models::{ApiResponse, PaginatedResponse, PaginationParams};

/// GET /api/v1/accounts/me
pub async fn get_me(
    State(service): State<Arc<AccountService>>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let account = service.get_account(user.account_id).await?;

    Ok(Json(ApiResponse::success(account.into())))
}

/// PUT /api/v1/accounts/me/capabilities
pub async fn update_capabilities(
    State(service): State<Arc<AccountService>>,
    user: AuthenticatedUser,
    Json(request): Json<UpdateCapabilitiesRequest>,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    request.validate()?;
    let account = service.update_capabilities(user.actor(), request).await?;

    Ok(Json(ApiResponse::success(account)))
}

/// GET /api/v1/accounts/me/credits
pub async fn credit_history(
    State(service): State<Arc<AccountService>>,
    user: AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<CreditTransaction>>>, ApiError> {
    let history = service.credit_history(user.actor(), pagination).await?;

    Ok(Json(ApiResponse::success(history)))
}

/// PUT /api/v1/accounts/me/preferences
pub async fn upsert_preferences(
    State(service): State<Arc<AccountService>>,
    user: AuthenticatedUser,
    Json(request): Json<UpdatePreferencesRequest>,
) -> Result<Json<ApiResponse<Preferences>>, ApiError> {
    request.validate()?;
    let preferences = service.upsert_preferences(user.actor(), request).await?;

    Ok(Json(ApiResponse::success(preferences)))
}

/// GET /api/v1/accounts/:id/preferences
pub async fn get_preferences(
    State(service): State<Arc<AccountService>>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Preferences>>, ApiError> {
    let preferences = service
        .get_preferences(account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No preferences for account {}", account_id)))?;

    Ok(Json(ApiResponse::success(preferences)))
}

/// POST /api/v1/admin/employees
pub async fn create_employee(
    State(service): State<Arc<AccountService>>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountResponse>>), ApiError> {
    request.validate()?;
    let employee = service.create_employee(admin.actor(), request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(employee))))
}
