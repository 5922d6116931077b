//! Middleware for the EcoRide API
//!
//! Request tracing, security headers and authentication extractors.

pub mod auth;
mod security;
mod tracing;

pub use auth::{AdminUser, AuthenticatedUser, EmployeeUser};
pub use security::{hsts_header, security_headers};
pub use tracing::request_tracing;
