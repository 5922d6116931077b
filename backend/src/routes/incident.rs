use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::incident;
use crate::state::AppState;

pub fn incident_routes() -> Router<AppState> {
    Router::new()
        .route("/incidents", get(incident::list_incidents))
        .route("/incidents/:id", get(incident::get_incident))
        .route("/incidents/:id/assign", post(incident::assign_incident))
        .route("/incidents/:id/resolve", post(incident::resolve_incident))
}
