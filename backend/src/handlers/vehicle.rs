use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::ApiResponse;
use crate::vehicle::{CreateVehicleRequest, UpdateVehicleRequest, Vehicle, VehicleService};

pub async fn create_vehicle(
    State(service): State<Arc<VehicleService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vehicle>>), ApiError> {
    request.validate()?;
    let vehicle = service.create_vehicle(user.actor(), request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(vehicle))))
}

pub async fn update_vehicle(
    State(service): State<Arc<VehicleService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVehicleRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, ApiError> {
    request.validate()?;
    let vehicle = service.update_vehicle(user.actor(), id, request).await?;

    Ok(Json(ApiResponse::success(vehicle)))
}

pub async fn list_my_vehicles(
    State(service): State<Arc<VehicleService>>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<Vehicle>>>, ApiError> {
    let vehicles = service.list_vehicles(user.account_id).await?;

    Ok(Json(ApiResponse::success(vehicles)))
}
