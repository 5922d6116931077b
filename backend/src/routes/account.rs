//! Account and admin routes

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::account;
use crate::state::AppState;

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts/me", get(account::get_me))
        .route(
            "/accounts/me/capabilities",
            put(account::update_capabilities),
        )
        .route("/accounts/me/credits", get(account::credit_history))
        .route("/accounts/me/preferences", put(account::upsert_preferences))
        .route("/accounts/:id/preferences", get(account::get_preferences))
        .route("/admin/employees", post(account::create_employee))
}
