//! API handlers for the EcoRide backend

pub mod account;
pub mod auth;
pub mod booking;
pub mod health;
pub mod incident;
pub mod review;
pub mod ride;
pub mod vehicle;

pub use crate::middleware::auth::{AdminUser, AuthenticatedUser, EmployeeUser};
