//! Ride routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::ride;
use crate::state::AppState;

pub fn ride_routes() -> Router<AppState> {
    Router::new()
        .route("/rides", get(ride::search_rides).post(ride::create_ride))
        .route("/rides/mine", get(ride::list_my_rides))
        .route("/rides/:id", get(ride::get_ride))
        .route("/rides/:id/start", post(ride::start_ride))
        .route("/rides/:id/end", post(ride::end_ride))
        .route("/rides/:id/cancel", post(ride::cancel_ride))
        .route("/rides/:id/bookings", get(ride::list_ride_bookings))
}
