//! Ride publication, search and driver lifecycle handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::AuthenticatedUser;
use crate::booking::{Booking, BookingService};
use crate::error::ApiError;
use crate::models::{ApiResponse, PaginatedResponse};
use crate::ride::{CreateRideRequest, Ride, RideFilter, RideService};

pub async fn create_ride(
    State(service): State<Arc<RideService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateRideRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Ride>>), ApiError> {
    request.validate()?;
    let ride = service.create_ride(user.actor(), request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(ride))))
}

/// GET /api/v1/rides - public search over open rides
pub async fn search_rides(
    State(service): State<Arc<RideService>>,
    Query(filter): Query<RideFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<Ride>>>, ApiError> {
    let rides = service.search_rides(filter).await?;

    Ok(Json(ApiResponse::success(rides)))
}

pub async fn get_ride(
    State(service): State<Arc<RideService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Ride>>, ApiError> {
    let ride = service.get_ride(id).await?;

    Ok(Json(ApiResponse::success(ride)))
}

pub async fn list_my_rides(
    State(service): State<Arc<RideService>>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<Ride>>>, ApiError> {
    let rides = service.list_driver_rides(user.account_id).await?;

    Ok(Json(ApiResponse::success(rides)))
}

pub async fn start_ride(
    State(service): State<Arc<RideService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Ride>>, ApiError> {
    let ride = service.start_ride(user.actor(), id).await?;

    Ok(Json(ApiResponse::success(ride)))
}

pub async fn end_ride(
    State(service): State<Arc<RideService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Ride>>, ApiError> {
    let ride = service.end_ride(user.actor(), id).await?;

    Ok(Json(ApiResponse::success(ride)))
}

pub async fn cancel_ride(
    State(service): State<Arc<RideService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Ride>>, ApiError> {
    let ride = service.cancel_ride(user.actor(), id).await?;

    Ok(Json(ApiResponse::success(ride)))
}

/// GET /api/v1/rides/:id/bookings - driver view of a ride's passengers
pub async fn list_ride_bookings(
    State(service): State<Arc<BookingService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Booking>>>, ApiError> {
    let bookings = service.list_ride_bookings(user.actor(), id).await?;

    Ok(Json(ApiResponse::success(bookings)))
}
