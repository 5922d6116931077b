//! Booking routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::booking;
use crate::state::AppState;

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/bookings",
            get(booking::list_my_bookings).post(booking::create_booking),
        )
        .route("/bookings/:id", get(booking::get_booking))
        .route("/bookings/:id/cancel", post(booking::cancel_booking))
        .route("/bookings/:id/confirm", post(booking::confirm_booking))
        .route("/bookings/:id/incident", post(booking::report_incident))
}
