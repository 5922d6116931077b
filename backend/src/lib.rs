//! EcoRide Backend Library
//!
//! Carpooling rides, seat bookings, the credit ledger and incident
//! settlement behind an axum REST API.

pub mod account;
pub mod auth;
pub mod booking;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod incident;
pub mod middleware;
pub mod models;
pub mod review;
pub mod ride;
pub mod routes;
pub mod state;
pub mod vehicle;
