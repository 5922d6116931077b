//! Route definitions for the EcoRide API

mod account;
mod auth;
mod booking;
mod incident;
mod review;
mod ride;
mod vehicle;

use axum::{routing::get, Router};

use crate::handlers::health::health_check;
use crate::state::AppState;

pub use account::account_routes;
pub use auth::auth_routes;
pub use booking::booking_routes;
pub use incident::incident_routes;
pub use review::review_routes;
pub use ride::ride_routes;
pub use vehicle::vehicle_routes;

/// Every API route under `/api/v1`, plus `/health`
pub fn api_router(state: AppState) -> Router {
    let v1 = Router::new()
        .merge(auth_routes())
        .merge(account_routes())
        .merge(vehicle_routes())
        .merge(ride_routes())
        .merge(booking_routes())
        .merge(incident_routes())
        .merge(review_routes());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1)
        .with_state(state)
}
