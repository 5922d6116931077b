//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::account::AccountService;
use crate::auth::AuthService;
use crate::booking::BookingService;
use crate::config::Config;
use crate::incident::IncidentService;
use crate::review::ReviewService;
use crate::ride::RideService;
use crate::vehicle::VehicleService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: Arc<AuthService>,
    pub account_service: Arc<AccountService>,
    pub vehicle_service: Arc<VehicleService>,
    pub ride_service: Arc<RideService>,
    pub booking_service: Arc<BookingService>,
    pub incident_service: Arc<IncidentService>,
    pub review_service: Arc<ReviewService>,
}

impl AppState {
    /// Wire every service onto one pool
    pub fn new(db_pool: PgPool, config: &Config) -> Self {
        Self {
            auth_service: Arc::new(AuthService::new(
                db_pool.clone(),
                config.jwt_secret.clone(),
                config.jwt_access_token_ttl_seconds,
                config.jwt_refresh_token_ttl_days,
                config.signup_credits,
            )),
            account_service: Arc::new(AccountService::new(db_pool.clone())),
            vehicle_service: Arc::new(VehicleService::new(db_pool.clone())),
            ride_service: Arc::new(RideService::new(db_pool.clone())),
            booking_service: Arc::new(BookingService::new(
                db_pool.clone(),
                config.platform_fee_per_seat,
            )),
            incident_service: Arc::new(IncidentService::new(db_pool.clone())),
            review_service: Arc::new(ReviewService::new(db_pool.clone())),
            db_pool,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<AccountService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.account_service.clone()
    }
}

impl FromRef<AppState> for Arc<VehicleService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.vehicle_service.clone()
    }
}

impl FromRef<AppState> for Arc<RideService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ride_service.clone()
    }
}

impl FromRef<AppState> for Arc<BookingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.booking_service.clone()
    }
}

impl FromRef<AppState> for Arc<IncidentService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.incident_service.clone()
    }
}

impl FromRef<AppState> for Arc<ReviewService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.review_service.clone()
    }
}
