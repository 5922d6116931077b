//! Passenger booking handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::AuthenticatedUser;
use crate::booking::{
    Booking, BookingService, CreateBookingRequest, ReportIncidentRequest,
    BOOKED_SEATS_PER_RESERVATION,
};
use crate::error::ApiError;
use crate::incident::Incident;
use crate::models::ApiResponse;

/// POST /api/v1/bookings - reserve one seat
pub async fn create_booking(
    State(service): State<Arc<BookingService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Booking>>), ApiError> {
    let booking = service
        .create_booking(user.actor(), request.ride_id, BOOKED_SEATS_PER_RESERVATION)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(booking))))
}

pub async fn list_my_bookings(
    State(service): State<Arc<BookingService>>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<Booking>>>, ApiError> {
    let bookings = service.list_passenger_bookings(user.actor()).await?;

    Ok(Json(ApiResponse::success(bookings)))
}

pub async fn get_booking(
    State(service): State<Arc<BookingService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let booking = service.get_booking(user.actor(), id).await?;

    Ok(Json(ApiResponse::success(booking)))
}

pub async fn cancel_booking(
    State(service): State<Arc<BookingService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let booking = service.cancel_booking(user.actor(), id).await?;

    Ok(Json(ApiResponse::success(booking)))
}

/// POST /api/v1/bookings/:id/confirm - the ride went well, pay the driver
pub async fn confirm_booking(
    State(service): State<Arc<BookingService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let booking = service.confirm_successful_booking(user.actor(), id).await?;

    Ok(Json(ApiResponse::success(booking)))
}

/// POST /api/v1/bookings/:id/incident - complete the booking and open an incident
pub async fn report_incident(
    State(service): State<Arc<BookingService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ReportIncidentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Incident>>), ApiError> {
    request.validate()?;
    let incident = service
        .confirm_booking_with_incident(user.actor(), id, &request.description)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(incident))))
}
