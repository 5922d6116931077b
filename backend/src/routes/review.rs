//! Review routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::review;
use crate::state::AppState;

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(review::create_review))
        .route("/reviews/pending", get(review::list_pending_reviews))
        .route("/reviews/:id/moderate", post(review::moderate_review))
        .route("/drivers/:id/reviews", get(review::list_driver_reviews))
}
