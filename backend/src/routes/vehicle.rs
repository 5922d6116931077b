use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers::vehicle;
use crate::state::AppState;

pub fn vehicle_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/vehicles",
            get(vehicle::list_my_vehicles).post(vehicle::create_vehicle),
        )
        .route("/vehicles/:id", put(vehicle::update_vehicle))
}
