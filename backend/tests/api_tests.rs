//! Router-level tests that never reach the database
//!
//! Authentication and request validation reject before any query runs, so a
//! lazily connected pool is enough.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use ecoride_server::account::{Account, Role};
use ecoride_server::auth::{generate_access_token, generate_refresh_token};
use ecoride_server::config::{Config, Environment};
use ecoride_server::routes::api_router;
use ecoride_server::state::AppState;

const JWT_SECRET: &str = "api-test-secret";

fn test_config() -> Config {
    Config {
        database_url: "postgresql://127.0.0.1:1/ecoride_unreachable".to_string(),
        environment: Environment::Development,
        port: 0,
        db_max_connections: 1,
        cors_allowed_origins: None,
        log_level: "warn".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_access_token_ttl_seconds: 900,
        jwt_refresh_token_ttl_days: 7,
        platform_fee_per_seat: 2,
        signup_credits: 20,
    }
}

fn app() -> Router {
    let config = test_config();
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(std::time::Duration::from_millis(500))
        .connect_lazy(&config.database_url)
        .expect("lazy pool");
    api_router(AppState::new(pool, &config))
}

fn account(role: Role) -> Account {
    Account {
        id: Uuid::new_v4(),
        email: "caller@example.com".to_string(),
        pseudo: "caller".to_string(),
        password_hash: String::new(),
        role,
        credits: 0,
        is_driver: role == Role::User,
        is_passenger: role == Role::User,
        rating: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn bearer(role: Role) -> String {
    let token = generate_access_token(&account(role), "test-jti", JWT_SECRET, 900).unwrap();
    format!("Bearer {}", token)
}

fn json_request(method: &str, uri: &str, auth: Option<String>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn error_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let response = app()
        .oneshot(json_request(
            "POST",
            "/api/v1/bookings",
            None,
            json!({ "ride_id": Uuid::new_v4() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = error_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["status"], 401);
}

#[tokio::test]
async fn test_refresh_token_cannot_authenticate() {
    let token = generate_refresh_token(&account(Role::User), "jti", JWT_SECRET, 7).unwrap();
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/accounts/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let token = generate_access_token(&account(Role::User), "jti", "other-secret", 900).unwrap();
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/bookings")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ride_price_out_of_range_is_rejected() {
    let departure = Utc::now() + Duration::days(1);
    let response = app()
        .oneshot(json_request(
            "POST",
            "/api/v1/rides",
            Some(bearer(Role::User)),
            json!({
                "vehicle_id": Uuid::new_v4(),
                "departure_city": "Lille",
                "departure_address": "Grand Place",
                "departure_at": departure,
                "arrival_city": "Arras",
                "arrival_address": "Gare",
                "arrival_at": departure + Duration::hours(1),
                "price": 5,
                "offered_seats": 2
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_register_validation_runs_before_storage() {
    let response = app()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            json!({ "email": "nope", "pseudo": "x", "password": "short" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_incident_routes_require_employee() {
    let response = app()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/incidents/{}/assign", Uuid::new_v4()),
            Some(bearer(Role::User)),
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_employee_creation_requires_admin() {
    let response = app()
        .oneshot(json_request(
            "POST",
            "/api/v1/admin/employees",
            Some(bearer(Role::Employee)),
            json!({
                "email": "new.employee@example.com",
                "pseudo": "newemployee",
                "password": "long-enough-password"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = error_body(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_incident_resolution_note_is_required() {
    let response = app()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/incidents/{}/resolve", Uuid::new_v4()),
            Some(bearer(Role::Employee)),
            json!({ "note": "" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
